use bytemuck::Pod;
use solana_program::hash::hashv;

use crate::consts::DISCRIMINATOR_LEN;
use crate::error::DecodeError;

/// An account class whose on-chain layout has grown over time.
///
/// Every version has a distinct total byte length (discriminator included),
/// and that length is the only thing used to pick a schema.
pub trait VersionedAccount: Sized {
    type Version: Copy + Eq + core::fmt::Debug + 'static;

    /// Anchor account name, hashed into the discriminator.
    const NAME: &'static str;

    /// `(total_len, version)` for every known layout.
    const LAYOUTS: &'static [(usize, Self::Version)];

    fn version(&self) -> Self::Version;

    /// Map the body of one layout (discriminator stripped) onto the normalized form.
    fn decode_body(body: &[u8], version: Self::Version) -> Result<Self, DecodeError>;

    /// Body bytes of one layout, without the discriminator.
    fn encode_body(&self, version: Self::Version) -> Vec<u8>;

    /// Size in bytes of the given layout, discriminator included.
    fn size_of(version: Self::Version) -> usize {
        Self::LAYOUTS
            .iter()
            .find(|(_, v)| *v == version)
            .map(|(len, _)| *len)
            .unwrap_or(0)
    }
}

/// Resolve the layout version for a buffer of `len` bytes.
pub fn version_for_len<T: VersionedAccount>(len: usize) -> Result<T::Version, DecodeError> {
    let min = T::LAYOUTS.iter().map(|(size, _)| *size).min().unwrap_or(0);
    if len < min {
        return Err(DecodeError::AccountTooSmall { len, min });
    }

    T::LAYOUTS
        .iter()
        .find(|(size, _)| *size == len)
        .map(|(_, version)| *version)
        .ok_or(DecodeError::UnsupportedVersion { len })
}

/// Decode a raw account buffer into its normalized form.
pub fn decode<T: VersionedAccount>(data: &[u8]) -> Result<T, DecodeError> {
    let version = version_for_len::<T>(data.len())?;
    let (discriminator, body) = data.split_at(DISCRIMINATOR_LEN.min(data.len()));
    if discriminator != account_discriminator(T::NAME) {
        return Err(DecodeError::DiscriminatorMismatch { name: T::NAME });
    }
    T::decode_body(body, version)
}

/// Encode an account into the given layout, discriminator first.
pub fn encode<T: VersionedAccount>(account: &T, version: T::Version) -> Vec<u8> {
    let mut data = Vec::with_capacity(T::size_of(version));
    data.extend_from_slice(&account_discriminator(T::NAME));
    data.extend_from_slice(&account.encode_body(version));
    data
}

/// View an account body as one fixed layout.
pub fn cast_body<L: Pod>(body: &[u8]) -> Result<&L, DecodeError> {
    bytemuck::try_from_bytes::<L>(body).map_err(|_| DecodeError::UnsupportedVersion {
        len: body.len() + DISCRIMINATOR_LEN,
    })
}

/// Anchor account discriminator: `sha256("account:<Name>")[..8]`.
pub fn account_discriminator(name: &str) -> [u8; 8] {
    discriminator("account:", name)
}

/// Anchor event discriminator: `sha256("event:<Name>")[..8]`.
pub fn event_discriminator(name: &str) -> [u8; 8] {
    discriminator("event:", name)
}

fn discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let hash = hashv(&[namespace.as_bytes(), name.as_bytes()]).to_bytes();
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash[..8]);
    out
}
