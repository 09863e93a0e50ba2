//! A [`Wire`] holds the false/true label pair for one boolean logic wire.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;

use crate::config::{GarbleConfig, Optimization};
use crate::label::Label;

#[derive(Debug, Clone)]
pub struct Wire {
    false_label: Label,
    true_label: Label,
    /// Externally supplied leaf identifier, e.g. `"A"`. Absent for wires
    /// shared between a child gate's output and its parent's input.
    pub identifier: Option<String>,
}

impl Wire {
    /// Build a fresh input wire: two independent random labels (classical),
    /// or a pp_bit-tagged pair, optionally free-XOR-linked via the
    /// circuit-global offset `R`.
    pub fn new(rng: &mut ChaCha12Rng, config: &GarbleConfig, r: Option<&[u8]>) -> Self {
        let mut false_label = Label::random(rng, config.num_bytes, Some(false));
        let mut true_label = Label::random(rng, config.num_bytes, Some(true));

        if config.optimization.uses_free_xor_offset() {
            let r = r.expect("free-XOR offset R required for this optimization");
            true_label.set_bytes(crate::bits::xor(false_label.bytes(), r));
        }

        if config.optimization.uses_pp_bits() {
            let b: bool = rng.random();
            false_label.set_pp_bit(Some(b));
            true_label.set_pp_bit(Some(!b));
        }

        Wire {
            false_label,
            true_label,
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn labels(&self) -> (&Label, &Label) {
        (&self.false_label, &self.true_label)
    }

    pub fn labels_mut(&mut self) -> (&mut Label, &mut Label) {
        (&mut self.false_label, &mut self.true_label)
    }

    pub fn get(&self, representing: bool) -> &Label {
        if representing {
            &self.true_label
        } else {
            &self.false_label
        }
    }

    pub fn get_mut(&mut self, representing: bool) -> &mut Label {
        if representing {
            &mut self.true_label
        } else {
            &mut self.false_label
        }
    }

    /// Recompute `true_label.bytes := false_label.bytes XOR R`, as required
    /// after the output label of a free-XOR/half-gates gate is assigned.
    pub fn relink_free_xor(&mut self, r: &[u8]) {
        self.true_label
            .set_bytes(crate::bits::xor(self.false_label.bytes(), r));
    }

    pub fn set_pp_bits_from_choice(&mut self, false_pp_bit: bool) {
        self.false_label.set_pp_bit(Some(false_pp_bit));
        self.true_label.set_pp_bit(Some(!false_pp_bit));
    }

    /// Recompute both pp_bits from each label's current last bit (used once
    /// a label's bytes have been derived rather than freshly sampled, e.g.
    /// GRR3's zero-entry label or half-gates' output label).
    pub fn refresh_pp_bits_from_last_bit(&mut self) {
        let fb = self.false_label.last_bit();
        let tb = self.true_label.last_bit();
        self.false_label.set_pp_bit(Some(fb));
        self.true_label.set_pp_bit(Some(tb));
    }

    /// Deep clone with wire-internal state scrubbed for transmission to the
    /// evaluator: labels keep their bytes and pp_bit but `represents` is
    /// cleared to unknown.
    pub fn sanitized(&self) -> Wire {
        let mut false_label = self.false_label.clone();
        let mut true_label = self.true_label.clone();
        false_label.clear_represents();
        true_label.clear_represents();
        Wire {
            false_label,
            true_label,
            identifier: self.identifier.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(opt: Optimization) -> GarbleConfig {
        GarbleConfig::new(opt)
    }

    #[test]
    fn classical_wires_have_no_pp_bits() {
        let mut rng = ChaCha12Rng::seed_from_u64(10);
        let wire = Wire::new(&mut rng, &config(Optimization::Classical), None);
        assert_eq!(wire.labels().0.pp_bit(), None);
        assert_eq!(wire.labels().1.pp_bit(), None);
    }

    #[test]
    fn point_and_permute_wires_have_opposing_pp_bits() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let wire = Wire::new(&mut rng, &config(Optimization::PointAndPermute), None);
        let (f, t) = wire.labels();
        assert_ne!(f.pp_bit(), t.pp_bit());
    }

    #[test]
    fn free_xor_wires_satisfy_offset_invariant() {
        let mut rng = ChaCha12Rng::seed_from_u64(12);
        let mut r = vec![0u8; 32];
        rng.fill_bytes(&mut r);
        *r.last_mut().unwrap() |= 1;
        let wire = Wire::new(&mut rng, &config(Optimization::FreeXor), Some(&r));
        let (f, t) = wire.labels();
        assert_eq!(t.bytes().to_vec(), crate::bits::xor(f.bytes(), &r));
    }

    #[test]
    fn sanitized_wire_clears_represents() {
        let mut rng = ChaCha12Rng::seed_from_u64(13);
        let wire = Wire::new(&mut rng, &config(Optimization::Classical), None);
        let sanitized = wire.sanitized();
        assert_eq!(sanitized.labels().0.represents(), None);
        assert_eq!(sanitized.labels().1.represents(), None);
    }
}
