//! Encrypting and decrypting pipes.
//!
//! Wire format: the raw salt, then zero or more sealed blocks of
//! `plaintext_len + TAG_LEN` bytes each. End of stream is the transport's EOF.

mod decryptor;
mod encryptor;

pub use decryptor::Decryptor;
pub use encryptor::Encryptor;

use std::io::{self, Read};

/// Diagnostic event emitted by a pipe. Carries sizes and counters only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipeEvent {
    SaltWritten { len: usize },
    BlockSealed { block: u64, plaintext_len: usize, ciphertext_len: usize },
    BlockOpened { block: u64, ciphertext_len: usize, plaintext_len: usize },
    EndOfStream { blocks: u64 },
    Failed { block: u64, reason: &'static str },
}

/// Side-effect-only callback receiving [`PipeEvent`]s.
pub type Observer = Box<dyn FnMut(&PipeEvent) + Send>;

/// Read until `buf` is full or the source reports EOF.
///
/// Returns the number of bytes read; anything short of `buf.len()` means
/// the source is exhausted.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::io::{self, Write};

    use crate::crypto::{Argon2Params, KdfProfile};

    pub fn cheap_profile() -> KdfProfile {
        KdfProfile::Argon2id(Argon2Params::new(256, 1, 1).unwrap())
    }

    pub struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("writer error"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Accepts `capacity` bytes, then stops making progress.
    pub struct ShortWriter {
        pub data: Vec<u8>,
        capacity: usize,
    }

    impl ShortWriter {
        pub fn new(capacity: usize) -> Self {
            Self {
                data: Vec::new(),
                capacity,
            }
        }
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.capacity - self.data.len());
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
