//! Symmetric primitives used by gate garbling.
//!
//! Two distinct ciphers are kept deliberately separate rather than unified
//! behind one trait: [`BlockCipher`] never fails to decrypt (callers must
//! already know, from protocol position, whether the result means
//! anything), while [`AuthCipher`] reports integrity failure and is the only
//! cipher classical garbling can use, since classical ungarble tries all
//! four table entries and needs a signal to stop.

use aes::Aes256;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};
use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit as AeadKeyInit},
};
use anyhow::{Result, anyhow};
use sha2::{Digest, Sha256};

const BLOCK_SIZE: usize = 16;
const LEN_PREFIX: usize = 4;
const GCM_NONCE_SIZE: usize = 12;

/// SHA-256-keyed AES-256 block cipher in ECB mode, with size-prefixed
/// zero-padding. Decryption never fails observably.
pub struct BlockCipher {
    cipher: Aes256,
}

impl BlockCipher {
    /// Derive the key as SHA-256 of arbitrary key material (typically the
    /// base64 form of a [`crate::label::Label`]).
    pub fn new(key_material: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key_material);
        let key = hasher.finalize();
        let cipher = Aes256::new(GenericArray::from_slice(&key));
        BlockCipher { cipher }
    }

    fn encrypt_blocks(&self, data: &mut [u8]) {
        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            let mut block = GenericArray::clone_from_slice(chunk);
            self.cipher.encrypt_block(&mut block);
            chunk.copy_from_slice(&block);
        }
    }

    fn decrypt_blocks(&self, data: &mut [u8]) {
        for chunk in data.chunks_exact_mut(BLOCK_SIZE) {
            let mut block = GenericArray::clone_from_slice(chunk);
            self.cipher.decrypt_block(&mut block);
            chunk.copy_from_slice(&block);
        }
    }

    /// Encrypt `plaintext`. If `pad`, prepends a 4-byte big-endian length
    /// prefix and zero-pads to a multiple of 16 bytes first; otherwise
    /// `plaintext` must already be exactly one 16-byte block.
    pub fn encrypt(&self, plaintext: &[u8], pad: bool) -> Vec<u8> {
        let mut buf = if pad {
            let mut padded = Vec::with_capacity(LEN_PREFIX + plaintext.len());
            padded.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
            padded.extend_from_slice(plaintext);
            let remainder = padded.len() % BLOCK_SIZE;
            if remainder != 0 {
                padded.resize(padded.len() + (BLOCK_SIZE - remainder), 0);
            }
            padded
        } else {
            assert_eq!(
                plaintext.len() % BLOCK_SIZE,
                0,
                "unpadded encrypt requires a whole number of 16-byte blocks"
            );
            plaintext.to_vec()
        };
        self.encrypt_blocks(&mut buf);
        buf
    }

    /// Encrypt, then encode as urlsafe base64.
    pub fn encrypt_to_base64(&self, plaintext: &[u8], pad: bool) -> String {
        use base64::Engine;
        base64::engine::general_purpose::URL_SAFE.encode(self.encrypt(plaintext, pad))
    }

    /// Decrypt `ciphertext`. If `unpad`, strips the 4-byte length prefix and
    /// truncates to the recorded plaintext length; otherwise returns the raw
    /// decrypted block. Never fails: malformed length prefixes are clamped
    /// to the available bytes rather than raising an error.
    pub fn decrypt(&self, ciphertext: &[u8], unpad: bool) -> Vec<u8> {
        let mut buf = ciphertext.to_vec();
        self.decrypt_blocks(&mut buf);
        if !unpad {
            return buf;
        }
        if buf.len() < LEN_PREFIX {
            return buf;
        }
        let len_bytes: [u8; 4] = buf[..LEN_PREFIX].try_into().unwrap();
        let len = u32::from_be_bytes(len_bytes) as usize;
        let available = buf.len() - LEN_PREFIX;
        let len = len.min(available);
        buf[LEN_PREFIX..LEN_PREFIX + len].to_vec()
    }

    /// Decrypt base64-encoded ciphertext.
    pub fn decrypt_from_base64(&self, ciphertext: &str, unpad: bool) -> Result<Vec<u8>> {
        use base64::Engine;
        let raw = base64::engine::general_purpose::URL_SAFE
            .decode(ciphertext)
            .map_err(|e| anyhow!("invalid base64 ciphertext: {e}"))?;
        Ok(self.decrypt(&raw, unpad))
    }
}

/// SHA-256-keyed AES-256-GCM authenticated cipher. Used only by classical
/// garbling, which must know whether decryption authenticated.
pub struct AuthCipher {
    cipher: Aes256Gcm,
}

impl AuthCipher {
    pub fn new(key_material: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key_material);
        let key = hasher.finalize();
        let cipher = Aes256Gcm::new(GenericArray::from_slice(&key));
        AuthCipher { cipher }
    }

    /// Encrypt with a fixed all-zero nonce. Each classical table entry is
    /// encrypted under a distinct derived key (different labels), so nonce
    /// reuse across entries does not reuse a (key, nonce) pair.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        let nonce = Nonce::from_slice(&[0u8; GCM_NONCE_SIZE]);
        self.cipher
            .encrypt(nonce, plaintext)
            .expect("AES-GCM encryption is infallible for in-memory buffers")
    }

    /// Decrypt, reporting authentication failure instead of garbage output.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Nonce::from_slice(&[0u8; GCM_NONCE_SIZE]);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| anyhow!("authenticated decryption failed"))
    }
}

/// Compute the GRR3 zero-ciphertext trick: a value whose double-encryption
/// under `key1` then `key2` is the all-zero k-byte block, found by
/// decrypting the zero block with `key2` then `key1`.
pub fn generate_zero_ciphertext(key1_material: &[u8], key2_material: &[u8], num_bytes: usize) -> Vec<u8> {
    let zero_block = vec![0u8; num_bytes];
    let cipher2 = BlockCipher::new(key2_material);
    let inner = cipher2.decrypt(&zero_block, false);
    let cipher1 = BlockCipher::new(key1_material);
    cipher1.decrypt(&inner, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_cipher_round_trips_with_padding() {
        let cipher = BlockCipher::new(b"some key material");
        let plaintext = b"garbled circuit output label";
        let ciphertext = cipher.encrypt(plaintext, true);
        let recovered = cipher.decrypt(&ciphertext, true);
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn block_cipher_round_trips_without_padding() {
        let cipher = BlockCipher::new(b"key");
        let plaintext = [7u8; BLOCK_SIZE];
        let ciphertext = cipher.encrypt(&plaintext, false);
        assert_eq!(cipher.decrypt(&ciphertext, false), plaintext);
    }

    #[test]
    fn base64_round_trip() {
        let cipher = BlockCipher::new(b"key material");
        let plaintext = b"payload";
        let encoded = cipher.encrypt_to_base64(plaintext, true);
        let decoded = cipher.decrypt_from_base64(&encoded, true).unwrap();
        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn auth_cipher_detects_tampering() {
        let cipher = AuthCipher::new(b"key material");
        let mut ciphertext = cipher.encrypt(b"true");
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0xFF;
        assert!(cipher.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn auth_cipher_round_trips() {
        let cipher = AuthCipher::new(b"key material");
        let ciphertext = cipher.encrypt(b"false");
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"false");
    }

    #[test]
    fn zero_ciphertext_decrypts_back_to_zero_block() {
        let k1 = b"left label base64";
        let k2 = b"right label base64";
        let value = generate_zero_ciphertext(k1, k2, BLOCK_SIZE);
        let c2 = BlockCipher::new(k2);
        let c1 = BlockCipher::new(k1);
        let encrypted_inner = c1.encrypt(&value, false);
        let zero = c2.encrypt(&encrypted_inner, false);
        assert_eq!(zero, vec![0u8; BLOCK_SIZE]);
    }
}
