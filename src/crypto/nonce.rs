//! Per-block nonces derived from a monotonic counter.

use sha3::{Digest, Sha3_256};

use super::NONCE_LEN;
use crate::error::{PipeError, Result};

/// Nonce for block number `counter`: the first 24 bytes of SHA3-256 over
/// the decimal rendering of the counter.
pub fn nonce_for(counter: u64) -> [u8; NONCE_LEN] {
    let digest = Sha3_256::digest(counter.to_string().as_bytes());

    let mut nonce = [0u8; NONCE_LEN];
    nonce.copy_from_slice(&digest[..NONCE_LEN]);
    nonce
}

/// Block counter shared by sealing and opening.
///
/// The counter only moves forward, and only through [`NonceSequence::advance`],
/// which callers invoke once a block has been fully processed.
#[derive(Debug, Default)]
pub struct NonceSequence {
    counter: u64,
}

impl NonceSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blocks processed so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Nonce for the next block. Does not move the counter.
    pub fn current(&self) -> [u8; NONCE_LEN] {
        nonce_for(self.counter)
    }

    pub fn advance(&mut self) -> Result<()> {
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(PipeError::CounterExhausted)?;
        Ok(())
    }
}
