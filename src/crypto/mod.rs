//! Cryptographic primitives for the pipe.
//!
//! Provides password-based key derivation, the per-block nonce sequence,
//! and the AEAD seal/open operations.

pub mod aead;
pub mod kdf;
pub mod nonce;

pub use aead::generate_salt;
pub use kdf::{Argon2Params, DerivedKey, KdfAlgorithm, KdfProfile, ScryptParams, derive_key};
pub use nonce::{NonceSequence, nonce_for};

/// Length of the derived key (32 bytes / 256 bits).
pub const KEY_LEN: usize = 32;
/// Length of the nonce (24 bytes for XSalsa20-Poly1305).
pub const NONCE_LEN: usize = 24;
/// Length of the authentication tag appended to every block.
pub const TAG_LEN: usize = 16;
/// Salt length for the current profiles.
pub const SALT_LEN: usize = 32;
/// Salt length for the legacy scrypt profile.
pub const LEGACY_SALT_LEN: usize = 16;
/// Shortest salt accepted by [`derive_key`].
pub const MIN_SALT_LEN: usize = 12;
/// Shortest password (in bytes) accepted by [`derive_key`].
pub const MIN_PASSWORD_LEN: usize = 5;
