//! Password-authenticated streaming encryption.
//!
//! A stream is written as the raw key-derivation salt followed by
//! independently authenticated NaCl secretbox (XSalsa20-Poly1305) blocks.
//! Block `i` is sealed under a nonce derived from the counter `i`, so blocks
//! cannot be reordered, dropped from the middle, or replayed without
//! detection.

mod crypto;
mod error;
mod pipe;

pub use crate::crypto::{
    Argon2Params, KdfAlgorithm, KdfProfile, LEGACY_SALT_LEN, MIN_PASSWORD_LEN, MIN_SALT_LEN,
    SALT_LEN, ScryptParams, TAG_LEN, derive_key, nonce_for,
};
pub use crate::error::{PipeError, Result};
pub use crate::pipe::{Decryptor, Encryptor, Observer, PipeEvent};

use std::io::{Read, Write};

use tracing::info;
use zeroize::Zeroizing;

/// Default plaintext buffer size (4 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Plaintext chunk size that seals into blocks of exactly `output_block_size` bytes.
pub fn buffer_size(output_block_size: usize) -> usize {
    output_block_size.saturating_sub(TAG_LEN)
}

/// Encrypt everything from `reader` into `writer`, one block per
/// `buffer_size` bytes of plaintext. Returns the plaintext byte count.
pub fn encrypt_stream<R: Read, W: Write>(
    mut reader: R,
    writer: W,
    password: &str,
    profile: &KdfProfile,
    buffer_size: usize,
) -> Result<u64> {
    if buffer_size == 0 {
        return Err(PipeError::UnsafeParameter("buffer size must be non-zero"));
    }

    let mut encryptor = Encryptor::new(writer, password, profile)?;
    let mut buf = Zeroizing::new(vec![0u8; buffer_size]);
    let mut total = 0u64;

    loop {
        let n = pipe::read_full(&mut reader, &mut buf).map_err(PipeError::ReadFailed)?;
        encryptor.write_block(&buf[..n])?;
        total += n as u64;

        if n < buffer_size {
            break;
        }
    }

    let blocks = encryptor.blocks();
    encryptor.finish()?;
    info!(bytes = total, blocks, "encrypted stream");
    Ok(total)
}

/// Decrypt a stream produced by [`encrypt_stream`] with the same
/// `buffer_size`. Returns the plaintext byte count.
pub fn decrypt_stream<R: Read, W: Write>(
    reader: R,
    mut writer: W,
    password: &str,
    profile: &KdfProfile,
    buffer_size: usize,
) -> Result<u64> {
    if buffer_size == 0 {
        return Err(PipeError::UnsafeParameter("buffer size must be non-zero"));
    }

    let mut decryptor = Decryptor::new(reader, password, profile)?;
    let mut buf = Zeroizing::new(vec![0u8; buffer_size]);
    let mut total = 0u64;

    loop {
        let n = match decryptor.read_block(&mut buf) {
            Ok(n) => n,
            Err(PipeError::EndOfStream) => break,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n]).map_err(PipeError::WriteFailed)?;
        total += n as u64;
    }

    writer.flush().map_err(PipeError::WriteFailed)?;
    info!(bytes = total, blocks = decryptor.blocks(), "decrypted stream");
    Ok(total)
}
