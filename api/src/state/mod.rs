mod config;
mod position;
mod profile;
mod stake;

pub use config::*;
pub use position::*;
pub use profile::*;
pub use stake::*;

use crate::decode::{decode, encode, VersionedAccount};
use crate::error::DecodeError;

/// Shorthands shared by every versioned account class.
pub trait AccountCodec: VersionedAccount {
    fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        decode::<Self>(data)
    }

    fn to_bytes(&self, version: Self::Version) -> Vec<u8> {
        encode(self, version)
    }

    /// Encode using the version the account was decoded from.
    fn to_own_bytes(&self) -> Vec<u8> {
        encode(self, self.version())
    }
}

impl<T: VersionedAccount> AccountCodec for T {}
