use thiserror::Error;

/// Raised when a raw account buffer cannot be mapped onto a known layout.
///
/// Every variant is scoped to a single account; callers degrade that one
/// account to "unavailable" and keep going.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Account data too small: {len} bytes, smallest known layout is {min}")]
    AccountTooSmall { len: usize, min: usize },

    #[error("Unsupported account version: no layout is {len} bytes long")]
    UnsupportedVersion { len: usize },

    #[error("Account discriminator does not match {name}")]
    DiscriminatorMismatch { name: &'static str },
}
