//! Gates: the boolean operation, its wires, and the garbled table. Hosts
//! all six garble/ungarble variants this
//! engine implements.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{Result, anyhow, bail};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::config::{GarbleConfig, Optimization};
use crate::crypto::{AuthCipher, BlockCipher, generate_zero_ciphertext};
use crate::label::Label;
use crate::wire::Wire;

/// Shared ownership of a wire: a child gate's output wire is the same
/// object as its parent's corresponding input wire.
pub type WireRef = Rc<RefCell<Wire>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateType {
    And,
    Or,
    Xor,
}

impl GateType {
    pub fn eval(self, left: bool, right: bool) -> bool {
        match self {
            GateType::And => left && right,
            GateType::Or => left || right,
            GateType::Xor => left ^ right,
        }
    }

    pub fn parse(token: &str) -> Result<Self> {
        match token {
            "AND" => Ok(GateType::And),
            "OR" => Ok(GateType::Or),
            "XOR" => Ok(GateType::Xor),
            other => bail!("unknown gate operator '{other}'"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GateType::And => "AND",
            GateType::Or => "OR",
            GateType::Xor => "XOR",
        }
    }
}

/// A gate's encrypted truth table. Variant shape mirrors the active
/// optimization: the natural systems-language representation of what the
/// source dispatches on via flag checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GarbledTable {
    Classical([Vec<u8>; 4]),
    PointAndPermute([Vec<u8>; 4]),
    Grr3([Vec<u8>; 3]),
    FreeXor,
    /// FleXOR's table has 0, 1, or 2 entries, keyed by the slot index used
    /// at ungarble time (`pp_bit` on the garbler side, `pp_bit + 2` on the
    /// evaluator side).
    FleXor(HashMap<u8, Vec<u8>>),
    HalfGates([Vec<u8>; 2]),
}

pub struct Gate {
    pub gate_type: GateType,
    pub left: Option<WireRef>,
    pub right: Option<WireRef>,
    pub output: WireRef,
    pub table: Option<GarbledTable>,
    /// Cached during evaluator-side reconstruction.
    pub chosen_label: Option<Label>,
}

impl Gate {
    /// Leaf gate: left and right are fresh input wires tagged with
    /// `left_id`/`right_id`.
    pub fn new_leaf(
        gate_type: GateType,
        left_id: impl Into<String>,
        right_id: impl Into<String>,
        rng: &mut ChaCha12Rng,
        config: &GarbleConfig,
        r: Option<&[u8]>,
    ) -> Self {
        let left = Wire::new(rng, config, r).with_identifier(left_id);
        let right = Wire::new(rng, config, r).with_identifier(right_id);
        let output = Wire::new(rng, config, r);
        Gate {
            gate_type,
            left: Some(Rc::new(RefCell::new(left))),
            right: Some(Rc::new(RefCell::new(right))),
            output: Rc::new(RefCell::new(output)),
            table: None,
            chosen_label: None,
        }
    }

    /// Internal gate: output wire is fresh; left/right are assigned once
    /// the corresponding child subtree has been built.
    pub fn new_internal(gate_type: GateType, rng: &mut ChaCha12Rng, config: &GarbleConfig, r: Option<&[u8]>) -> Self {
        let output = Wire::new(rng, config, r);
        Gate {
            gate_type,
            left: None,
            right: None,
            output: Rc::new(RefCell::new(output)),
            table: None,
            chosen_label: None,
        }
    }

    /// Garble this gate according to the active optimization. Requires
    /// `left`/`right` to already be populated (post-order invariant).
    pub fn garble(&mut self, rng: &mut ChaCha12Rng, config: &GarbleConfig, r: Option<&[u8]>) -> Result<()> {
        let left = self
            .left
            .as_ref()
            .ok_or_else(|| anyhow!("gate garbled before its left wire was assigned"))?
            .clone();
        let right = self
            .right
            .as_ref()
            .ok_or_else(|| anyhow!("gate garbled before its right wire was assigned"))?
            .clone();

        self.table = Some(match config.optimization {
            Optimization::Classical => garble_classical(self.gate_type, &left, &right, &self.output, rng)?,
            Optimization::PointAndPermute => garble_point_and_permute(self.gate_type, &left, &right, &self.output)?,
            Optimization::Grr3 => garble_grr3(self.gate_type, &left, &right, &self.output)?,
            Optimization::FreeXor => {
                if self.gate_type == GateType::Xor {
                    garble_free_xor(&left, &right, &self.output, r.expect("R required"))?;
                    GarbledTable::FreeXor
                } else {
                    garble_point_and_permute(self.gate_type, &left, &right, &self.output)?
                }
            }
            Optimization::FleXor => {
                if self.gate_type == GateType::Xor {
                    garble_flexor(&left, &right, &self.output, rng)?
                } else {
                    garble_grr3(self.gate_type, &left, &right, &self.output)?
                }
            }
            Optimization::HalfGates => {
                if self.gate_type == GateType::Xor {
                    garble_free_xor(&left, &right, &self.output, r.expect("R required"))?;
                    GarbledTable::FreeXor
                } else if self.gate_type == GateType::And {
                    garble_half_gates(&left, &right, &self.output, r.expect("R required"))?
                } else {
                    garble_point_and_permute(self.gate_type, &left, &right, &self.output)?
                }
            }
        });
        Ok(())
    }

    /// Ungarble given the chosen left/right labels, mirroring `garble`'s
    /// dispatch.
    pub fn ungarble(&self, config: &GarbleConfig, left_label: &Label, right_label: &Label) -> Result<Label> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| anyhow!("gate has no garbled table"))?;
        ungarble_table(config, table, left_label, right_label)
    }
}

/// Dispatch ungarble purely from a gate's table and the active
/// optimization, without needing a full [`Gate`] — used by evaluator-side
/// reconstruction, which only ever sees sanitized tables.
pub fn ungarble_table(config: &GarbleConfig, table: &GarbledTable, left_label: &Label, right_label: &Label) -> Result<Label> {
    match (config.optimization, table) {
            (Optimization::Classical, GarbledTable::Classical(entries)) => ungarble_classical(left_label, right_label, entries),
            (Optimization::PointAndPermute, GarbledTable::PointAndPermute(entries)) => {
                ungarble_point_and_permute(left_label, right_label, entries)
            }
            (Optimization::Grr3, GarbledTable::Grr3(entries)) => ungarble_grr3(left_label, right_label, entries, config.num_bytes),
            (Optimization::FreeXor, GarbledTable::FreeXor) => Ok(ungarble_free_xor(left_label, right_label)),
            (Optimization::FreeXor, GarbledTable::PointAndPermute(entries)) => {
                ungarble_point_and_permute(left_label, right_label, entries)
            }
            (Optimization::FleXor, GarbledTable::FleXor(entries)) => ungarble_flexor(left_label, right_label, entries),
            (Optimization::FleXor, GarbledTable::Grr3(entries)) => ungarble_grr3(left_label, right_label, entries, config.num_bytes),
            (Optimization::HalfGates, GarbledTable::HalfGates(entries)) => ungarble_half_gates(left_label, right_label, entries),
            (Optimization::HalfGates, GarbledTable::FreeXor) => Ok(ungarble_free_xor(left_label, right_label)),
            (Optimization::HalfGates, GarbledTable::PointAndPermute(entries)) => {
                ungarble_point_and_permute(left_label, right_label, entries)
            }
            _ => bail!("garbled table shape does not match the active optimization"),
    }
}

fn nested_encrypt_label(serialized: &[u8], key1: &Label, key2: &Label, pad: bool) -> Vec<u8> {
    let inner = BlockCipher::new(key2.to_base64().as_bytes()).encrypt(serialized, pad);
    BlockCipher::new(key1.to_base64().as_bytes()).encrypt(&inner, pad)
}

fn nested_decrypt_label(ciphertext: &[u8], key1: &Label, key2: &Label, pad: bool) -> Vec<u8> {
    let inner = BlockCipher::new(key1.to_base64().as_bytes()).decrypt(ciphertext, pad);
    BlockCipher::new(key2.to_base64().as_bytes()).decrypt(&inner, pad)
}

// (a) Classical -----------------------------------------------------------

fn garble_classical(gate_type: GateType, left: &WireRef, right: &WireRef, output: &WireRef, rng: &mut ChaCha12Rng) -> Result<GarbledTable> {
    let left_wire = left.borrow();
    let right_wire = right.borrow();
    let mut entries = Vec::with_capacity(4);
    for &left_bit in &[false, true] {
        for &right_bit in &[false, true] {
            let left_label = left_wire.get(left_bit);
            let right_label = right_wire.get(right_bit);
            let output_bit = gate_type.eval(left_bit, right_bit);
            let output_bytes = output.borrow().get(output_bit).bytes().to_vec();

            let k1 = AuthCipher::new(left_label.to_base64().as_bytes());
            let k2 = AuthCipher::new(right_label.to_base64().as_bytes());
            entries.push(k1.encrypt(&k2.encrypt(&output_bytes)));
        }
    }
    entries.shuffle(rng);
    let array: [Vec<u8>; 4] = entries.try_into().map_err(|_| anyhow!("expected 4 classical entries"))?;
    Ok(GarbledTable::Classical(array))
}

fn ungarble_classical(left_label: &Label, right_label: &Label, entries: &[Vec<u8>; 4]) -> Result<Label> {
    let k1 = AuthCipher::new(left_label.to_base64().as_bytes());
    let k2 = AuthCipher::new(right_label.to_base64().as_bytes());
    for entry in entries {
        if let Ok(inner) = k1.decrypt(entry) {
            if let Ok(plaintext) = k2.decrypt(&inner) {
                return Ok(Label::from_bytes(plaintext, None));
            }
        }
    }
    bail!("no classical table entry authenticated under the given labels")
}

// (b) Point-and-permute -----------------------------------------------------

fn pp_index(left_bit: bool, right_bit: bool) -> usize {
    2 * (left_bit as usize) + (right_bit as usize)
}

fn garble_point_and_permute(gate_type: GateType, left: &WireRef, right: &WireRef, output: &WireRef) -> Result<GarbledTable> {
    let left_wire = left.borrow();
    let right_wire = right.borrow();
    let mut entries: Vec<Vec<u8>> = vec![Vec::new(); 4];
    for &left_bit in &[false, true] {
        for &right_bit in &[false, true] {
            let left_label = left_wire.get(left_bit);
            let right_label = right_wire.get(right_bit);
            let left_pp = left_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
            let right_pp = right_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
            let output_bit = gate_type.eval(left_bit, right_bit);
            let output_bytes = output.borrow().get(output_bit).bytes().to_vec();
            entries[pp_index(left_pp, right_pp)] = nested_encrypt_label(&output_bytes, left_label, right_label, true);
        }
    }
    let array: [Vec<u8>; 4] = entries.try_into().map_err(|_| anyhow!("expected 4 point-and-permute entries"))?;
    Ok(GarbledTable::PointAndPermute(array))
}

fn ungarble_point_and_permute(left_label: &Label, right_label: &Label, entries: &[Vec<u8>; 4]) -> Result<Label> {
    let left_pp = left_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
    let right_pp = right_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
    let entry = &entries[pp_index(left_pp, right_pp)];
    let plaintext = nested_decrypt_label(entry, left_label, right_label, true);
    Ok(Label::from_bytes(plaintext, None))
}

// (c) GRR3 -------------------------------------------------------------------

fn garble_grr3(gate_type: GateType, left: &WireRef, right: &WireRef, output: &WireRef) -> Result<GarbledTable> {
    let num_bytes;
    {
        let left_wire = left.borrow();
        let right_wire = right.borrow();
        num_bytes = left_wire.get(false).bytes().len();

        let l0 = find_pp_zero_label(&left_wire)?;
        let r0 = find_pp_zero_label(&right_wire)?;
        let zero_value = generate_zero_ciphertext(l0.to_base64().as_bytes(), r0.to_base64().as_bytes(), num_bytes);

        let l0_represents = l0.represents().ok_or_else(|| anyhow!("left zero-pp label missing represents"))?;
        let r0_represents = r0.represents().ok_or_else(|| anyhow!("right zero-pp label missing represents"))?;
        let zero_entry_bit = gate_type.eval(l0_represents, r0_represents);

        drop(left_wire);
        drop(right_wire);
        let mut output_wire = output.borrow_mut();
        output_wire.get_mut(zero_entry_bit).set_bytes(zero_value);
        output_wire.refresh_pp_bits_from_last_bit();
    }

    let left_wire = left.borrow();
    let right_wire = right.borrow();
    let mut entries: Vec<Vec<u8>> = vec![Vec::new(); 3];
    for &left_bit in &[false, true] {
        for &right_bit in &[false, true] {
            let left_label = left_wire.get(left_bit);
            let right_label = right_wire.get(right_bit);
            let left_pp = left_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
            let right_pp = right_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
            if !left_pp && !right_pp {
                continue; // elided by the zero-ciphertext trick
            }
            let output_bit = gate_type.eval(left_bit, right_bit);
            let output_bytes = output.borrow().get(output_bit).bytes().to_vec();
            let index = pp_index(left_pp, right_pp) - 1;
            entries[index] = nested_encrypt_label(&output_bytes, left_label, right_label, true);
        }
    }
    let array: [Vec<u8>; 3] = entries.try_into().map_err(|_| anyhow!("expected 3 GRR3 entries"))?;
    Ok(GarbledTable::Grr3(array))
}

fn find_pp_zero_label(wire: &Wire) -> Result<Label> {
    let (false_label, true_label) = wire.labels();
    if false_label.pp_bit() == Some(false) {
        Ok(false_label.clone())
    } else if true_label.pp_bit() == Some(false) {
        Ok(true_label.clone())
    } else {
        bail!("wire has no label with pp_bit 0")
    }
}

fn ungarble_grr3(left_label: &Label, right_label: &Label, entries: &[Vec<u8>; 3], num_bytes: usize) -> Result<Label> {
    let left_pp = left_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
    let right_pp = right_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
    if !left_pp && !right_pp {
        let zero_value = generate_zero_ciphertext(left_label.to_base64().as_bytes(), right_label.to_base64().as_bytes(), num_bytes);
        return Ok(Label::from_bytes(zero_value, None));
    }
    let index = pp_index(left_pp, right_pp) - 1;
    let plaintext = nested_decrypt_label(&entries[index], left_label, right_label, true);
    Ok(Label::from_bytes(plaintext, None))
}

// (d) FreeXOR -----------------------------------------------------------------

fn garble_free_xor(left: &WireRef, right: &WireRef, output: &WireRef, r: &[u8]) -> Result<()> {
    let c0 = {
        let left_wire = left.borrow();
        let right_wire = right.borrow();
        crate::bits::xor(left_wire.get(false).bytes(), right_wire.get(false).bytes())
    };
    let mut output_wire = output.borrow_mut();
    output_wire.get_mut(false).set_bytes(c0);
    output_wire.relink_free_xor(r);
    output_wire.refresh_pp_bits_from_last_bit();
    Ok(())
}

fn ungarble_free_xor(left_label: &Label, right_label: &Label) -> Label {
    Label::from_bytes(left_label.xor(right_label), None)
}

// (e) FleXOR ------------------------------------------------------------------

fn garble_flexor(left: &WireRef, right: &WireRef, output: &WireRef, rng: &mut ChaCha12Rng) -> Result<GarbledTable> {
    // Resample output true_label until its last bit differs from false_label's.
    {
        let mut output_wire = output.borrow_mut();
        let num_bytes = output_wire.get(false).bytes().len();
        loop {
            let (fb, tb) = {
                let (f, t) = output_wire.labels();
                (f.last_bit(), t.last_bit())
            };
            if fb != tb {
                break;
            }
            let mut fresh = vec![0u8; num_bytes];
            use rand::RngCore;
            rng.fill_bytes(&mut fresh);
            output_wire.get_mut(true).set_bytes(fresh);
        }
    }

    let (a0, a1, r1) = {
        let left_wire = left.borrow();
        let (f, t) = left_wire.labels();
        (f.bytes().to_vec(), t.bytes().to_vec(), crate::bits::xor(f.bytes(), t.bytes()))
    };
    let (b0, b1, r2) = {
        let right_wire = right.borrow();
        let (f, t) = right_wire.labels();
        (f.bytes().to_vec(), t.bytes().to_vec(), crate::bits::xor(f.bytes(), t.bytes()))
    };
    let (c0_old, r3) = {
        let output_wire = output.borrow();
        let (f, t) = output_wire.labels();
        (f.bytes().to_vec(), crate::bits::xor(f.bytes(), t.bytes()))
    };
    let _ = c0_old;

    let a0_label = Label::from_bytes(a0.clone(), None);
    let b0_label = Label::from_bytes(b0.clone(), None);
    let a0_prime = BlockCipher::new(a0_label.to_base64().as_bytes()).decrypt(&vec![0u8; a0.len()], false);
    let b0_prime = BlockCipher::new(b0_label.to_base64().as_bytes()).decrypt(&vec![0u8; b0.len()], false);

    let c0_prime = crate::bits::xor(&a0_prime, &b0_prime);
    let c1_prime = crate::bits::xor(&c0_prime, &r3);
    let a1_prime = crate::bits::xor(&a0_prime, &r3);
    let b1_prime = crate::bits::xor(&b0_prime, &r3);

    {
        let mut output_wire = output.borrow_mut();
        output_wire.get_mut(false).set_bytes(c0_prime);
        output_wire.get_mut(true).set_bytes(c1_prime);
        output_wire.refresh_pp_bits_from_last_bit();
    }

    let right_true_pp = right.borrow().get(true).pp_bit().unwrap_or(false);
    let left_true_pp = left.borrow().get(true).pp_bit().unwrap_or(false);

    let mut entries = HashMap::new();
    if r1 == r2 && r2 == r3 {
        // degenerates to FreeXOR, empty table
    } else if r1 == r3 && r2 != r3 {
        let cipher = BlockCipher::new(Label::from_bytes(b1.clone(), None).to_base64().as_bytes());
        entries.insert((right_true_pp as u8) + 2, cipher.encrypt(&b1_prime, false));
    } else if r2 == r3 && r1 != r3 {
        let cipher = BlockCipher::new(Label::from_bytes(a1.clone(), None).to_base64().as_bytes());
        entries.insert(left_true_pp as u8, cipher.encrypt(&a1_prime, false));
    } else {
        let cipher_a = BlockCipher::new(Label::from_bytes(a1.clone(), None).to_base64().as_bytes());
        entries.insert(left_true_pp as u8, cipher_a.encrypt(&a1_prime, false));
        let cipher_b = BlockCipher::new(Label::from_bytes(b1.clone(), None).to_base64().as_bytes());
        entries.insert((right_true_pp as u8) + 2, cipher_b.encrypt(&b1_prime, false));
    }
    Ok(GarbledTable::FleXor(entries))
}

fn ungarble_flexor(left_label: &Label, right_label: &Label, entries: &HashMap<u8, Vec<u8>>) -> Result<Label> {
    let num_bytes = left_label.bytes().len();
    let transform = |label: &Label, slot: u8| -> Vec<u8> {
        match entries.get(&slot) {
            Some(entry) => {
                let cipher = BlockCipher::new(label.to_base64().as_bytes());
                cipher.decrypt(entry, false)
            }
            None => vec![0u8; num_bytes],
        }
    };
    let left_pp = left_label.pp_bit().unwrap_or(false) as u8;
    let right_pp = right_label.pp_bit().unwrap_or(false) as u8;
    let a_prime = transform(left_label, left_pp);
    let b_prime = transform(right_label, right_pp + 2);
    Ok(Label::from_bytes(crate::bits::xor(&a_prime, &b_prime), None))
}

// (f) Half-gates --------------------------------------------------------------

fn h(x: &[u8], num_bytes: usize) -> Vec<u8> {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(x);
    let digest = hasher.finalize();
    let mut out = vec![0u8; num_bytes];
    let n = num_bytes.min(digest.len());
    out[..n].copy_from_slice(&digest[..n]);
    out
}

fn garble_half_gates(left: &WireRef, right: &WireRef, output: &WireRef, r: &[u8]) -> Result<GarbledTable> {
    let (a0, a1, p_a) = {
        let left_wire = left.borrow();
        let (f, t) = left_wire.labels();
        (f.bytes().to_vec(), t.bytes().to_vec(), f.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?)
    };
    let (b0, b1, p_b) = {
        let right_wire = right.borrow();
        let (f, t) = right_wire.labels();
        (f.bytes().to_vec(), t.bytes().to_vec(), f.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?)
    };
    let num_bytes = a0.len();

    let h_a0 = h(&a0, num_bytes);
    let h_a1 = h(&a1, num_bytes);
    let h_b0 = h(&b0, num_bytes);
    let h_b1 = h(&b1, num_bytes);

    let mut entry1 = crate::bits::xor(&h_a0, &h_a1);
    if p_b {
        entry1 = crate::bits::xor(&entry1, r);
    }
    let mut c_g = h_a0.clone();
    if p_a {
        c_g = crate::bits::xor(&c_g, &entry1);
    }

    let entry2 = crate::bits::xor(&crate::bits::xor(&h_b0, &h_b1), &a0);
    let mut c_e = h_b0.clone();
    if p_b {
        c_e = crate::bits::xor(&c_e, &crate::bits::xor(&entry2, &a0));
    }

    let false_bytes = crate::bits::xor(&c_g, &c_e);
    {
        let mut output_wire = output.borrow_mut();
        output_wire.get_mut(false).set_bytes(false_bytes);
        output_wire.relink_free_xor(r);
        output_wire.refresh_pp_bits_from_last_bit();
    }
    Ok(GarbledTable::HalfGates([entry1, entry2]))
}

fn ungarble_half_gates(left_label: &Label, right_label: &Label, entries: &[Vec<u8>; 2]) -> Result<Label> {
    let num_bytes = left_label.bytes().len();
    let s_a = left_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;
    let s_b = right_label.pp_bit().ok_or_else(|| anyhow!("missing pp_bit"))?;

    let h_a = h(left_label.bytes(), num_bytes);
    let c_g = if s_a { crate::bits::xor(&h_a, &entries[0]) } else { h_a };

    let h_b = h(right_label.bytes(), num_bytes);
    let c_e = if s_b {
        crate::bits::xor(&crate::bits::xor(&h_b, &entries[1]), left_label.bytes())
    } else {
        h_b
    };

    Ok(Label::from_bytes(crate::bits::xor(&c_g, &c_e), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fresh_r(rng: &mut ChaCha12Rng, num_bytes: usize) -> Vec<u8> {
        use rand::RngCore;
        let mut r = vec![0u8; num_bytes];
        rng.fill_bytes(&mut r);
        *r.last_mut().unwrap() |= 1;
        r
    }

    #[test]
    fn classical_and_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(100);
        let config = GarbleConfig::new(Optimization::Classical);
        let mut gate = Gate::new_leaf(GateType::And, "A", "B", &mut rng, &config, None);
        gate.garble(&mut rng, &config, None).unwrap();

        let left_bit = true;
        let right_bit = false;
        let left_label = gate.left.as_ref().unwrap().borrow().get(left_bit).clone();
        let right_label = gate.right.as_ref().unwrap().borrow().get(right_bit).clone();
        let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
        let expected = gate.output.borrow().get(left_bit && right_bit).clone();
        assert_eq!(out, expected);
    }

    #[test]
    fn point_and_permute_xor_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(101);
        let config = GarbleConfig::new(Optimization::PointAndPermute);
        let mut gate = Gate::new_leaf(GateType::Xor, "A", "B", &mut rng, &config, None);
        gate.garble(&mut rng, &config, None).unwrap();

        for &(lb, rb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let left_label = gate.left.as_ref().unwrap().borrow().get(lb).clone();
            let right_label = gate.right.as_ref().unwrap().borrow().get(rb).clone();
            let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
            let expected = gate.output.borrow().get(lb ^ rb).clone();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn grr3_and_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(102);
        let config = GarbleConfig::new(Optimization::Grr3);
        let mut gate = Gate::new_leaf(GateType::And, "A", "B", &mut rng, &config, None);
        gate.garble(&mut rng, &config, None).unwrap();

        for &(lb, rb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let left_label = gate.left.as_ref().unwrap().borrow().get(lb).clone();
            let right_label = gate.right.as_ref().unwrap().borrow().get(rb).clone();
            let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
            let expected = gate.output.borrow().get(lb && rb).clone();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn free_xor_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(103);
        let config = GarbleConfig::new(Optimization::FreeXor);
        let r = fresh_r(&mut rng, config.num_bytes);
        let mut gate = Gate::new_leaf(GateType::Xor, "A", "B", &mut rng, &config, Some(&r));
        gate.garble(&mut rng, &config, Some(&r)).unwrap();

        for &(lb, rb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let left_label = gate.left.as_ref().unwrap().borrow().get(lb).clone();
            let right_label = gate.right.as_ref().unwrap().borrow().get(rb).clone();
            let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
            let expected = gate.output.borrow().get(lb ^ rb).clone();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn half_gates_and_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(104);
        let config = GarbleConfig::new(Optimization::HalfGates);
        let r = fresh_r(&mut rng, config.num_bytes);
        let mut gate = Gate::new_leaf(GateType::And, "A", "B", &mut rng, &config, Some(&r));
        gate.garble(&mut rng, &config, Some(&r)).unwrap();

        for &(lb, rb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let left_label = gate.left.as_ref().unwrap().borrow().get(lb).clone();
            let right_label = gate.right.as_ref().unwrap().borrow().get(rb).clone();
            let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
            let expected = gate.output.borrow().get(lb && rb).clone();
            assert_eq!(out, expected);
        }
    }

    #[test]
    fn flexor_xor_gate_round_trips() {
        let mut rng = ChaCha12Rng::seed_from_u64(105);
        let config = GarbleConfig::new(Optimization::FleXor);
        let mut gate = Gate::new_leaf(GateType::Xor, "A", "B", &mut rng, &config, None);
        gate.garble(&mut rng, &config, None).unwrap();

        for &(lb, rb) in &[(false, false), (false, true), (true, false), (true, true)] {
            let left_label = gate.left.as_ref().unwrap().borrow().get(lb).clone();
            let right_label = gate.right.as_ref().unwrap().borrow().get(rb).clone();
            let out = gate.ungarble(&config, &left_label, &right_label).unwrap();
            let expected = gate.output.borrow().get(lb ^ rb).clone();
            assert_eq!(out, expected);
        }
    }
}
