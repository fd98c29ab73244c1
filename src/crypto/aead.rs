use crypto_secretbox::{
    Key, Nonce, XSalsa20Poly1305,
    aead::{Aead, KeyInit},
};
use getrandom::fill;
use zeroize::Zeroizing;

use super::{KEY_LEN, NONCE_LEN, TAG_LEN};
use crate::error::{PipeError, Result};

/// Fill buffer with cryptographically secure random bytes
fn secure_random(buf: &mut [u8]) -> Result<()> {
    fill(buf).map_err(|_| PipeError::EntropyUnavailable)
}

/// Generate a fresh salt of `len` bytes
pub fn generate_salt(len: usize) -> Result<Vec<u8>> {
    let mut salt = vec![0u8; len];
    secure_random(&mut salt)?;
    Ok(salt)
}

/// Seal one block as a NaCl secretbox: the tag comes first, then the
/// ciphertext, `plaintext.len() + TAG_LEN` bytes in all.
///
/// Returns `None` only if the cipher rejects the input length.
pub fn seal(key: &[u8; KEY_LEN], nonce: &[u8; NONCE_LEN], plaintext: &[u8]) -> Option<Vec<u8>> {
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    let ciphertext = cipher.encrypt(Nonce::from_slice(nonce), plaintext).ok()?;
    debug_assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
    Some(ciphertext)
}

/// Open one block. `None` means the tag did not verify.
pub fn open(
    key: &[u8; KEY_LEN],
    nonce: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Option<Zeroizing<Vec<u8>>> {
    let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .ok()
        .map(Zeroizing::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::nonce_for;

    #[test]
    fn seal_open_roundtrip() {
        let key = [42u8; KEY_LEN];
        let nonce = nonce_for(0);

        let ct = seal(&key, &nonce, b"secret data").unwrap();
        assert_eq!(ct.len(), 11 + TAG_LEN);

        let pt = open(&key, &nonce, &ct).unwrap();
        assert_eq!(pt.as_slice(), b"secret data");
    }

    #[test]
    fn open_with_other_nonce_fails() {
        let key = [42u8; KEY_LEN];
        let ct = seal(&key, &nonce_for(0), b"secret data").unwrap();
        assert!(open(&key, &nonce_for(1), &ct).is_none());
    }

    #[test]
    fn open_with_other_key_fails() {
        let ct = seal(&[1u8; KEY_LEN], &nonce_for(0), b"secret data").unwrap();
        assert!(open(&[2u8; KEY_LEN], &nonce_for(0), &ct).is_none());
    }

    #[test]
    fn empty_plaintext_is_tag_only() {
        let key = [5u8; KEY_LEN];
        let ct = seal(&key, &nonce_for(7), b"").unwrap();
        assert_eq!(ct.len(), TAG_LEN);
        assert!(open(&key, &nonce_for(7), &ct).unwrap().is_empty());
    }

    #[test]
    fn opens_nacl_secretbox_block() {
        // secretbox.Seal(nil, "hello world", sha3_256("0")[:24], [0x42; 32])
        let sealed = [
            0x87, 0xa1, 0x09, 0xe5, 0xa2, 0xb8, 0x64, 0x2e, 0x8e, 0x24, 0xde, 0xb3, 0xaf, 0xf1,
            0xa7, 0xab, 0x2f, 0x98, 0x2c, 0xf9, 0x41, 0x3a, 0x17, 0x4a, 0x06, 0xe9, 0x11,
        ];
        let key = [0x42u8; KEY_LEN];

        let pt = open(&key, &nonce_for(0), &sealed).unwrap();
        assert_eq!(pt.as_slice(), b"hello world");
        assert_eq!(seal(&key, &nonce_for(0), b"hello world").unwrap(), sealed);
    }

    #[test]
    fn tag_precedes_ciphertext() {
        let key = [9u8; KEY_LEN];
        let a = seal(&key, &nonce_for(3), b"aaaa").unwrap();
        let b = seal(&key, &nonce_for(3), b"aaab").unwrap();
        // same keystream, so only the last byte of the body differs
        assert_ne!(a[..TAG_LEN], b[..TAG_LEN]);
        assert_eq!(a[TAG_LEN..TAG_LEN + 3], b[TAG_LEN..TAG_LEN + 3]);
    }

    #[test]
    fn salts_are_random() {
        let a = generate_salt(32).unwrap();
        let b = generate_salt(32).unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
