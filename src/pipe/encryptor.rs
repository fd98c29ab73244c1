use std::io::{self, Write};

use tracing::{debug, trace};

use super::{Observer, PipeEvent};
use crate::crypto::{self, DerivedKey, KdfProfile, NonceSequence, aead, derive_key};
use crate::error::{PipeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SaltPending,
    Streaming,
    Poisoned,
}

/// Encrypting half of the pipe.
///
/// Every non-empty [`write_block`](Encryptor::write_block) call becomes
/// exactly one sealed block on the sink. The salt goes out in front of the
/// first block, or on [`finish`](Encryptor::finish) if nothing was written.
pub struct Encryptor<W: Write> {
    sink: W,
    key: DerivedKey,
    salt: Vec<u8>,
    nonces: NonceSequence,
    state: State,
    observer: Option<Observer>,
}

impl<W: Write> Encryptor<W> {
    /// Generates a fresh salt for `profile` and derives the stream key.
    ///
    /// Nothing is written to `sink` until the first block.
    pub fn new(sink: W, password: &str, profile: &KdfProfile) -> Result<Self> {
        let salt = crypto::generate_salt(profile.salt_len())?;
        Self::with_salt(sink, password, profile, salt)
    }

    pub(crate) fn with_salt(
        sink: W,
        password: &str,
        profile: &KdfProfile,
        salt: Vec<u8>,
    ) -> Result<Self> {
        let key = derive_key(password, &salt, profile)?;
        debug!(
            algorithm = profile.algorithm().name(),
            salt_len = salt.len(),
            "encryptor ready"
        );

        Ok(Self {
            sink,
            key,
            salt,
            nonces: NonceSequence::new(),
            state: State::SaltPending,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Number of blocks sealed and written so far.
    pub fn blocks(&self) -> u64 {
        self.nonces.counter()
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Seal `plaintext` as one block and write it to the sink.
    ///
    /// An empty chunk is always a no-op and consumes no nonce. Any sink
    /// failure poisons the pipe: the counter stays put and every later
    /// non-empty write fails with [`PipeError::Terminated`].
    pub fn write_block(&mut self, plaintext: &[u8]) -> Result<usize> {
        if plaintext.is_empty() {
            return Ok(0);
        }
        if self.state == State::Poisoned {
            return Err(PipeError::Terminated);
        }

        if self.state == State::SaltPending {
            self.write_salt()?;
        }

        let block = self.nonces.counter();
        let nonce = self.nonces.current();

        let Some(ciphertext) = aead::seal(&self.key, &nonce, plaintext) else {
            let err = io::Error::new(io::ErrorKind::InvalidInput, "block too large to seal");
            return Err(self.fail(block, "seal", PipeError::WriteFailed(err)));
        };

        if let Err(e) = self.sink.write_all(&ciphertext) {
            return Err(self.fail(block, "sink write", PipeError::WriteFailed(e)));
        }

        if let Err(e) = self.nonces.advance() {
            return Err(self.fail(block, "counter", e));
        }

        trace!(block, plaintext_len = plaintext.len(), "sealed block");
        self.emit(PipeEvent::BlockSealed {
            block,
            plaintext_len: plaintext.len(),
            ciphertext_len: ciphertext.len(),
        });

        Ok(plaintext.len())
    }

    /// Flush and hand back the sink.
    ///
    /// A stream with no blocks still carries its salt, so the salt is
    /// written here if no block went out.
    pub fn finish(mut self) -> Result<W> {
        match self.state {
            State::Poisoned => return Err(PipeError::Terminated),
            State::SaltPending => self.write_salt()?,
            State::Streaming => {}
        }

        self.sink.flush().map_err(PipeError::WriteFailed)?;
        debug!(blocks = self.nonces.counter(), "encryptor finished");
        Ok(self.sink)
    }

    fn write_salt(&mut self) -> Result<()> {
        if let Err(e) = self.sink.write_all(&self.salt) {
            return Err(self.fail(0, "salt write", PipeError::WriteFailed(e)));
        }
        self.state = State::Streaming;
        self.emit(PipeEvent::SaltWritten {
            len: self.salt.len(),
        });
        Ok(())
    }

    fn fail(&mut self, block: u64, reason: &'static str, err: PipeError) -> PipeError {
        self.state = State::Poisoned;
        debug!(block, reason, "encryptor failed");
        self.emit(PipeEvent::Failed { block, reason });
        err
    }

    fn emit(&mut self, event: PipeEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }
}

impl<W: Write> Write for Encryptor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_block(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{SALT_LEN, TAG_LEN};
    use crate::pipe::testutil::{FailingWriter, ShortWriter, cheap_profile};
    use std::sync::{Arc, Mutex};

    #[test]
    fn first_block_is_preceded_by_salt() {
        let mut enc = Encryptor::new(Vec::new(), "correct-password", &cheap_profile()).unwrap();
        enc.write_block(b"hello world").unwrap();

        let salt = enc.salt().to_vec();
        let out = enc.finish().unwrap();

        assert_eq!(salt.len(), SALT_LEN);
        assert_eq!(out.len(), SALT_LEN + 11 + TAG_LEN);
        assert_eq!(&out[..SALT_LEN], salt.as_slice());
    }

    #[test]
    fn blocks_keep_their_sizes() {
        let mut enc = Encryptor::new(Vec::new(), "password", &cheap_profile()).unwrap();
        enc.write_block(&[1u8; 100]).unwrap();
        enc.write_block(&[2u8; 7]).unwrap();
        assert_eq!(enc.blocks(), 2);

        let out = enc.finish().unwrap();
        assert_eq!(out.len(), SALT_LEN + 100 + TAG_LEN + 7 + TAG_LEN);
    }

    #[test]
    fn empty_write_is_noop() {
        let mut enc = Encryptor::new(Vec::new(), "password", &cheap_profile()).unwrap();
        assert_eq!(enc.write_block(b"").unwrap(), 0);
        assert_eq!(enc.blocks(), 0);
        assert!(enc.get_ref().is_empty());
    }

    #[test]
    fn finish_without_blocks_writes_salt_only() {
        let enc = Encryptor::new(Vec::new(), "password", &cheap_profile()).unwrap();
        let out = enc.finish().unwrap();
        assert_eq!(out.len(), SALT_LEN);
    }

    #[test]
    fn short_password_fails_construction() {
        let err = Encryptor::new(Vec::new(), "pass", &cheap_profile()).err().unwrap();
        assert!(matches!(err, PipeError::UnsafeParameter(_)));
    }

    #[test]
    fn zero_salt_fails_construction() {
        let err = Encryptor::with_salt(Vec::new(), "password", &cheap_profile(), vec![0u8; 32])
            .err()
            .unwrap();
        assert!(matches!(err, PipeError::UnsafeParameter(_)));
    }

    #[test]
    fn failing_sink_surfaces_write_error() {
        let mut enc = Encryptor::new(FailingWriter, "password", &cheap_profile()).unwrap();

        let err = enc.write_block(b"testtesttest").unwrap_err();
        assert!(matches!(err, PipeError::WriteFailed(_)));
        assert_eq!(enc.blocks(), 0);

        assert!(matches!(enc.write_block(b"again"), Err(PipeError::Terminated)));
    }

    #[test]
    fn zero_length_write_succeeds_after_failure() {
        let mut enc = Encryptor::new(FailingWriter, "password", &cheap_profile()).unwrap();
        assert!(enc.write_block(b"testtesttest").is_err());

        assert_eq!(enc.write_block(b"").unwrap(), 0);
        assert_eq!(enc.blocks(), 0);
        assert!(matches!(enc.write_block(b"again"), Err(PipeError::Terminated)));
    }

    #[test]
    fn short_sink_write_does_not_advance_counter() {
        // room for the salt and half a block
        let sink = ShortWriter::new(SALT_LEN + 10);
        let mut enc = Encryptor::new(sink, "password", &cheap_profile()).unwrap();

        let err = enc.write_block(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, PipeError::WriteFailed(_)));
        assert_eq!(enc.blocks(), 0);
        assert!(matches!(enc.finish(), Err(PipeError::Terminated)));
    }

    #[test]
    fn observer_sees_salt_and_blocks() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);

        let mut enc = Encryptor::new(Vec::new(), "password", &cheap_profile())
            .unwrap()
            .with_observer(Box::new(move |e: &PipeEvent| {
                sink_events.lock().unwrap().push(e.clone())
            }));
        enc.write_block(b"abc").unwrap();

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                PipeEvent::SaltWritten { len: SALT_LEN },
                PipeEvent::BlockSealed {
                    block: 0,
                    plaintext_len: 3,
                    ciphertext_len: 3 + TAG_LEN,
                },
            ]
        );
    }

    #[test]
    fn io_write_maps_to_blocks() {
        let mut enc = Encryptor::new(Vec::new(), "password", &cheap_profile()).unwrap();
        enc.write_all(b"via io::Write").unwrap();
        enc.flush().unwrap();
        assert_eq!(enc.blocks(), 1);
    }
}
