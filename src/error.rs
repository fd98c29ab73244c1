use std::io;

use thiserror::Error;

/// Errors produced by key derivation and the encrypting/decrypting pipes.
#[derive(Debug, Error)]
pub enum PipeError {
    /// Password or salt fails the minimum-strength checks.
    #[error("unsafe parameter: {0}")]
    UnsafeParameter(&'static str),

    /// Unknown key derivation selector.
    #[error("unsupported key derivation: {0}")]
    Unsupported(String),

    /// The key stretching primitive itself failed.
    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("read failed")]
    ReadFailed(#[source] io::Error),

    #[error("write failed")]
    WriteFailed(#[source] io::Error),

    /// Clean end of the ciphertext stream. Expected, not a failure.
    #[error("end of stream")]
    EndOfStream,

    #[error("authentication failed on block {block}: invalid password or corrupted data")]
    AuthenticationFailed { block: u64 },

    #[error("truncated block {block}: {len} bytes is shorter than the authentication tag")]
    TruncatedBlock { block: u64, len: usize },

    /// A previous failure left the pipe unsynchronized.
    #[error("pipe is unusable after a previous failure")]
    Terminated,

    #[error("block counter exhausted")]
    CounterExhausted,

    #[error("OS random generator unavailable")]
    EntropyUnavailable,
}

impl PipeError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, PipeError::EndOfStream)
    }
}

impl From<PipeError> for io::Error {
    fn from(err: PipeError) -> Self {
        let kind = match &err {
            PipeError::ReadFailed(e) | PipeError::WriteFailed(e) => e.kind(),
            PipeError::EndOfStream | PipeError::TruncatedBlock { .. } => {
                io::ErrorKind::UnexpectedEof
            }
            PipeError::AuthenticationFailed { .. } => io::ErrorKind::InvalidData,
            PipeError::UnsafeParameter(_) | PipeError::Unsupported(_) => {
                io::ErrorKind::InvalidInput
            }
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, PipeError>;
