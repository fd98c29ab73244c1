use std::io::{self, Read};

use tracing::{debug, trace, warn};

use super::{Observer, PipeEvent, read_full};
use crate::crypto::{DerivedKey, KdfProfile, NonceSequence, TAG_LEN, aead, derive_key};
use crate::error::{PipeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Ended,
    Poisoned,
}

/// Decrypting half of the pipe.
///
/// Each [`read_block`](Decryptor::read_block) call with a buffer of `L`
/// bytes consumes one sealed block of up to `L + TAG_LEN` bytes, so the
/// reader must use the same buffer size the writer used for its blocks.
pub struct Decryptor<R: Read> {
    source: R,
    key: DerivedKey,
    nonces: NonceSequence,
    scratch: Vec<u8>,
    state: State,
    observer: Option<Observer>,
}

impl<R: Read> Decryptor<R> {
    /// Reads the salt from `source` and derives the stream key.
    pub fn new(mut source: R, password: &str, profile: &KdfProfile) -> Result<Self> {
        let mut salt = vec![0u8; profile.salt_len()];
        source.read_exact(&mut salt).map_err(PipeError::ReadFailed)?;

        let key = derive_key(password, &salt, profile)?;
        debug!(
            algorithm = profile.algorithm().name(),
            salt_len = salt.len(),
            "decryptor ready"
        );

        Ok(Self {
            source,
            key,
            nonces: NonceSequence::new(),
            scratch: Vec::new(),
            state: State::Streaming,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of blocks opened so far.
    pub fn blocks(&self) -> u64 {
        self.nonces.counter()
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Open the next block into `buf`, returning the plaintext length.
    ///
    /// A clean EOF before the block yields [`PipeError::EndOfStream`]. A
    /// short block at EOF is opened as the final block. Authentication or
    /// source failures poison the pipe. An empty `buf` always reads nothing.
    pub fn read_block(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.state {
            State::Poisoned => return Err(PipeError::Terminated),
            State::Ended => return Err(PipeError::EndOfStream),
            State::Streaming => {}
        }

        let block = self.nonces.counter();
        let wanted = buf.len() + TAG_LEN;
        self.scratch.resize(wanted, 0);

        let n = match read_full(&mut self.source, &mut self.scratch[..wanted]) {
            Ok(n) => n,
            Err(e) => return Err(self.fail(block, "source read", PipeError::ReadFailed(e))),
        };

        if n == 0 {
            self.state = State::Ended;
            debug!(blocks = block, "end of stream");
            self.emit(PipeEvent::EndOfStream { blocks: block });
            return Err(PipeError::EndOfStream);
        }
        if n < TAG_LEN {
            return Err(self.fail(
                block,
                "truncated block",
                PipeError::TruncatedBlock { block, len: n },
            ));
        }

        let nonce = self.nonces.current();
        let opened = aead::open(&self.key, &nonce, &self.scratch[..n]);
        let Some(plaintext) = opened else {
            warn!(block, "block failed authentication");
            return Err(self.fail(
                block,
                "authentication",
                PipeError::AuthenticationFailed { block },
            ));
        };

        buf[..plaintext.len()].copy_from_slice(&plaintext);

        if let Err(e) = self.nonces.advance() {
            return Err(self.fail(block, "counter", e));
        }

        trace!(block, plaintext_len = plaintext.len(), "opened block");
        self.emit(PipeEvent::BlockOpened {
            block,
            ciphertext_len: n,
            plaintext_len: plaintext.len(),
        });

        Ok(plaintext.len())
    }

    fn fail(&mut self, block: u64, reason: &'static str, err: PipeError) -> PipeError {
        self.state = State::Poisoned;
        debug!(block, reason, "decryptor failed");
        self.emit(PipeEvent::Failed { block, reason });
        err
    }

    fn emit(&mut self, event: PipeEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

/// `EndOfStream` reads as `Ok(0)`; every other failure becomes an `io::Error`
/// wrapping the [`PipeError`].
impl<R: Read> Read for Decryptor<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read_block(buf) {
            Ok(n) => Ok(n),
            Err(PipeError::EndOfStream) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
