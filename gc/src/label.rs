//! A [`Label`] is a uniformly random k-byte token standing in for one
//! boolean value on one wire.

use base64::Engine;
use rand::RngCore;
use rand_chacha::ChaCha12Rng;

/// A k-byte cryptographic token. Equality for protocol purposes is defined
/// over the base64 encoding of its bytes.
#[derive(Debug, Clone)]
pub struct Label {
    bytes: Vec<u8>,
    /// Boolean truth value this label stands for, known only to the
    /// garbler. Must be cleared before the label leaves the garbler's
    /// process.
    represents: Option<bool>,
    /// Point-and-permute bit; absent in classical mode.
    pp_bit: Option<bool>,
}

impl Label {
    /// Sample a fresh random label of `num_bytes` length.
    pub fn random(rng: &mut ChaCha12Rng, num_bytes: usize, represents: Option<bool>) -> Self {
        let mut bytes = vec![0u8; num_bytes];
        rng.fill_bytes(&mut bytes);
        Label {
            bytes,
            represents,
            pp_bit: None,
        }
    }

    /// Construct a label from explicit bytes (used when a label's bytes are
    /// derived rather than sampled, e.g. free-XOR's `true_label`).
    pub fn from_bytes(bytes: Vec<u8>, represents: Option<bool>) -> Self {
        Label {
            bytes,
            represents,
            pp_bit: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn set_bytes(&mut self, bytes: Vec<u8>) {
        self.bytes = bytes;
    }

    pub fn represents(&self) -> Option<bool> {
        self.represents
    }

    pub fn set_represents(&mut self, value: Option<bool>) {
        self.represents = value;
    }

    /// Clear `represents` to unknown. Required before a label leaves the
    /// garbler's process.
    pub fn clear_represents(&mut self) {
        self.represents = None;
    }

    pub fn pp_bit(&self) -> Option<bool> {
        self.pp_bit
    }

    pub fn set_pp_bit(&mut self, value: Option<bool>) {
        self.pp_bit = value;
    }

    /// Canonical textual form, used as symmetric-cipher key material and as
    /// the equality basis for protocol comparisons.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::URL_SAFE.encode(&self.bytes)
    }

    pub fn to_base32(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes).to_uppercase()
    }

    /// Big-endian integer interpretation of the label bytes.
    pub fn to_bytes_be(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn xor(&self, other: &Label) -> Vec<u8> {
        crate::bits::xor(&self.bytes, &other.bytes)
    }

    pub fn last_bit(&self) -> bool {
        crate::bits::last_bit(&self.bytes)
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.to_base64() == other.to_base64()
    }
}
impl Eq for Label {}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn equality_is_over_base64_form() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let a = Label::random(&mut rng, 32, Some(true));
        let b = Label::from_bytes(a.bytes().to_vec(), Some(false));
        assert_eq!(a, b);
    }

    #[test]
    fn clearing_represents_hides_truth_value() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let mut label = Label::random(&mut rng, 32, Some(true));
        label.clear_represents();
        assert_eq!(label.represents(), None);
    }
}
