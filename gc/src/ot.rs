//! 1-out-of-2 oblivious transfer using an RSA trapdoor permutation.
//!
//! Key generation and modular arithmetic are hand-rolled on `num-bigint`/
//! `num-traits` rather than built on the `rsa` crate: this is not standard
//! RSA encryption but an additively-masked trapdoor exchange, and
//! `rsa`/`num-bigint-dig` pull in an older `rand_core` than the rest of
//! this workspace depends on.

use std::io::{Read, Write};

use anyhow::{Context, Result, bail};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::transport::{receive, send, send_ack, wait_for_ack};

/// Minimum RSA modulus size in bits. Per Open Question (d): the additive
/// masking in step 5 requires the serialized label to be smaller than the
/// modulus, so the modulus must comfortably exceed `8 * num_bytes`.
pub const MIN_KEY_BITS: usize = 512;

/// Public RSA exponent. Fixed at the conventional Fermat-prime value.
const PUBLIC_EXPONENT: u32 = 65537;

/// Number of Miller-Rabin rounds used when generating OT keypairs.
const MILLER_RABIN_ROUNDS: usize = 32;

/// Choose an RSA modulus size safely larger than the label width being
/// transferred.
pub fn key_bits_for_label_width(num_bytes: usize) -> usize {
    MIN_KEY_BITS.max(num_bytes * 8 * 2)
}

struct RsaKeyPair {
    n: BigUint,
    e: BigUint,
    d: BigUint,
}

/// Sample a uniformly random `BigUint` in `[0, bound)` by rejection
/// sampling over the byte width of `bound`.
fn uniform_below(rng: &mut ChaCha12Rng, bound: &BigUint) -> BigUint {
    let byte_len = bound.to_bytes_be().len().max(1);
    loop {
        let mut bytes = vec![0u8; byte_len];
        rng.fill_bytes(&mut bytes);
        let candidate = BigUint::from_bytes_be(&bytes);
        if candidate < *bound {
            return candidate;
        }
    }
}

/// Sample a uniformly random `BigUint` in `[low, high)`.
fn uniform_range(rng: &mut ChaCha12Rng, low: &BigUint, high: &BigUint) -> BigUint {
    let span = high - low;
    low + uniform_below(rng, &span)
}

/// Sample a random odd `bits`-bit integer with the top bit set, so the
/// product of two such primes has exactly `2*bits` bits.
fn random_odd_candidate(rng: &mut ChaCha12Rng, bits: usize) -> BigUint {
    let n_bytes = bits.div_ceil(8);
    let mut bytes = vec![0u8; n_bytes];
    rng.fill_bytes(&mut bytes);
    let extra_bits = (n_bytes * 8 - bits) as u32;
    bytes[0] &= 0xFFu8.checked_shr(extra_bits).unwrap_or(0);
    bytes[0] |= 0x80u8.checked_shr(extra_bits).unwrap_or(0);
    *bytes.last_mut().unwrap() |= 1;
    BigUint::from_bytes_be(&bytes)
}

/// Miller-Rabin primality test.
fn is_probable_prime(n: &BigUint, rng: &mut ChaCha12Rng, rounds: usize) -> bool {
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);
    if *n < two {
        return false;
    }
    if *n == two || *n == three {
        return true;
    }
    if (n % &two).is_zero() {
        return false;
    }

    let n_minus_one = n - BigUint::one();
    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while (&d % &two).is_zero() {
        d /= &two;
        r += 1;
    }

    'witness: for _ in 0..rounds {
        let a = uniform_range(rng, &two, &(n - &two));
        let mut x = a.modpow(&d, n);
        if x == BigUint::one() || x == n_minus_one {
            continue;
        }
        for _ in 0..r.saturating_sub(1) {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

fn generate_prime(rng: &mut ChaCha12Rng, bits: usize) -> BigUint {
    loop {
        let candidate = random_odd_candidate(rng, bits);
        if is_probable_prime(&candidate, rng, MILLER_RABIN_ROUNDS) {
            return candidate;
        }
    }
}

/// `(neg, magnitude)` pair used while running the extended Euclidean
/// algorithm over otherwise-unsigned `BigUint`s.
fn signed_sub(a_neg: bool, a: &BigUint, b_neg: bool, b: &BigUint) -> (bool, BigUint) {
    match (a_neg, b_neg) {
        (false, false) | (true, true) => {
            if a >= b {
                (a_neg, a - b)
            } else {
                (!a_neg, b - a)
            }
        }
        (false, true) => (false, a + b),
        (true, false) => (true, a + b),
    }
}

/// Extended Euclidean algorithm, returning `(gcd, t_neg, |t|)` such that
/// `a*t + b*k = gcd` for some integer `k`.
fn extended_gcd(a: &BigUint, b: &BigUint) -> (BigUint, bool, BigUint) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_t_neg, mut old_t, mut t_neg, mut t) = (false, BigUint::zero(), false, BigUint::one());

    while !r.is_zero() {
        let q = &old_r / &r;
        let new_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, new_r);

        let (nt_neg, nt) = signed_sub(old_t_neg, &old_t, t_neg, &(&q * &t));
        old_t = std::mem::replace(&mut t, nt);
        old_t_neg = std::mem::replace(&mut t_neg, nt_neg);
    }
    (old_r, old_t_neg, old_t)
}

/// Modular inverse of `a` modulo `m`.
fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    let (gcd, t_neg, t) = extended_gcd(a, m);
    if gcd != BigUint::one() {
        bail!("modular inverse does not exist: gcd != 1");
    }
    if t_neg { Ok(m - (&t % m)) } else { Ok(&t % m) }
}

fn generate_rsa_keypair(rng: &mut ChaCha12Rng, key_bits: usize) -> Result<RsaKeyPair> {
    let half_bits = key_bits / 2;
    let e = BigUint::from(PUBLIC_EXPONENT);
    loop {
        let p = generate_prime(rng, half_bits);
        let q = generate_prime(rng, key_bits - half_bits);
        if p == q {
            continue;
        }
        let n = &p * &q;
        let phi = (&p - BigUint::one()) * (&q - BigUint::one());
        if let Ok(d) = mod_inverse(&e, &phi) {
            return Ok(RsaKeyPair { n, e, d });
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OtParams {
    x0: Vec<u8>,
    x1: Vec<u8>,
    n: Vec<u8>,
    e: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct OtChoice {
    v: Vec<u8>,
}

#[derive(Serialize, Deserialize)]
struct OtPayload {
    c0: Vec<u8>,
    c1: Vec<u8>,
    len0: u32,
    len1: u32,
}

fn biguint_to_bytes(x: &BigUint) -> Vec<u8> {
    x.to_bytes_be()
}
fn bytes_to_biguint(b: &[u8]) -> BigUint {
    BigUint::from_bytes_be(b)
}

/// Modular subtraction for unsigned big integers: `(a - b) mod n`.
fn mod_sub(a: &BigUint, b: &BigUint, n: &BigUint) -> BigUint {
    if a >= b {
        (a - b) % n
    } else {
        (n - (b - a)) % n
    }
}

/// Garbler side: send `m0` if the evaluator's choice bit is false, `m1` if
/// true, learning nothing about which the evaluator picked.
pub fn garbler_ot<S: Read + Write>(stream: &mut S, rng: &mut ChaCha12Rng, m0: &[u8], m1: &[u8], key_bits: usize) -> Result<()> {
    let RsaKeyPair { n, e, d } = generate_rsa_keypair(rng, key_bits).context("RSA keypair generation failed")?;

    let half_n = &n / BigUint::from(2u32);
    let x0 = uniform_range(rng, &BigUint::from(2u32), &half_n);
    let x1 = uniform_range(rng, &BigUint::from(2u32), &half_n);

    send(
        stream,
        &OtParams {
            x0: biguint_to_bytes(&x0),
            x1: biguint_to_bytes(&x1),
            n: biguint_to_bytes(&n),
            e: biguint_to_bytes(&e),
        },
    )?;

    let choice: OtChoice = receive(stream)?;
    let v = bytes_to_biguint(&choice.v);

    let k0 = mod_sub(&v, &x0, &n).modpow(&d, &n);
    let k1 = mod_sub(&v, &x1, &n).modpow(&d, &n);

    if bytes_to_biguint(m0) >= n || bytes_to_biguint(m1) >= n {
        bail!("label does not fit under the OT modulus; increase key_bits_for_label_width");
    }

    let m0_int = bytes_to_biguint(m0);
    let m1_int = bytes_to_biguint(m1);
    let c0 = (m0_int + &k0) % &n;
    let c1 = (m1_int + &k1) % &n;

    send(
        stream,
        &OtPayload {
            c0: biguint_to_bytes(&c0),
            c1: biguint_to_bytes(&c1),
            len0: m0.len() as u32,
            len1: m1.len() as u32,
        },
    )?;

    wait_for_ack(stream)?;
    Ok(())
}

/// Evaluator side: recover `m_b` for choice bit `b`, without revealing `b`
/// to the garbler.
pub fn evaluator_ot<S: Read + Write>(stream: &mut S, rng: &mut ChaCha12Rng, b: bool) -> Result<Vec<u8>> {
    let params: OtParams = receive(stream)?;
    let n = bytes_to_biguint(&params.n);
    let e = bytes_to_biguint(&params.e);
    let x0 = bytes_to_biguint(&params.x0);
    let x1 = bytes_to_biguint(&params.x1);
    let x_b = if b { &x1 } else { &x0 };

    let half_n = &n / BigUint::from(2u32);
    let k = uniform_range(rng, &BigUint::from(2u32), &half_n);
    let v = (x_b + k.modpow(&e, &n)) % &n;

    send(stream, &OtChoice { v: biguint_to_bytes(&v) })?;

    let payload: OtPayload = receive(stream)?;
    let (c_b, len_b) = if b {
        (bytes_to_biguint(&payload.c1), payload.len1 as usize)
    } else {
        (bytes_to_biguint(&payload.c0), payload.len0 as usize)
    };

    let m_b = mod_sub(&c_b, &k, &n);
    let mut bytes = biguint_to_bytes(&m_b);
    if bytes.len() < len_b {
        let mut padded = vec![0u8; len_b - bytes.len()];
        padded.append(&mut bytes);
        bytes = padded;
    } else if bytes.len() > len_b {
        bytes = bytes[bytes.len() - len_b..].to_vec();
    }

    crate::transport::send_ack(stream)?;
    Ok(bytes)
}

/// Fill an RNG-derived byte buffer; exposed for callers that need raw
/// entropy outside of a [`ChaCha12Rng`], matching the protocol's
/// requirement that (a) label bytes, (b) R, (c) RSA primes, and (d) OT
/// values all come from a cryptographically strong source.
pub fn fresh_bytes(rng: &mut ChaCha12Rng, len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    rng.fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::mpsc::{Receiver, Sender, channel};
    use std::thread;

    /// An in-process duplex pipe standing in for the TCP socket, so these
    /// tests exercise `garbler_ot`/`evaluator_ot` exactly as written.
    struct ChannelStream {
        tx: Sender<Vec<u8>>,
        rx: Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for ChannelStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            while self.pending.len() < buf.len() {
                match self.rx.recv() {
                    Ok(chunk) => self.pending.extend_from_slice(&chunk),
                    Err(_) => break,
                }
            }
            let n = buf.len().min(self.pending.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }
    impl Write for ChannelStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.tx.send(buf.to_vec()).map_err(|_| std::io::Error::other("peer gone"))?;
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn duplex() -> (ChannelStream, ChannelStream) {
        let (a_to_b, b_from_a) = channel();
        let (b_to_a, a_from_b) = channel();
        (
            ChannelStream { tx: a_to_b, rx: a_from_b, pending: Vec::new() },
            ChannelStream { tx: b_to_a, rx: b_from_a, pending: Vec::new() },
        )
    }

    #[test]
    fn mod_inverse_round_trips() {
        let a = BigUint::from(17u32);
        let m = BigUint::from(3120u32);
        let inv = mod_inverse(&a, &m).unwrap();
        assert_eq!((&a * &inv) % &m, BigUint::one());
    }

    #[test]
    fn miller_rabin_accepts_known_primes_rejects_composites() {
        let mut rng = ChaCha12Rng::seed_from_u64(99);
        for p in [2u32, 3, 5, 7, 11, 104729] {
            assert!(is_probable_prime(&BigUint::from(p), &mut rng, 20), "{p} should be prime");
        }
        for c in [4u32, 6, 8, 9, 100, 104730] {
            assert!(!is_probable_prime(&BigUint::from(c), &mut rng, 20), "{c} should be composite");
        }
    }

    #[test]
    fn ot_transfers_only_the_chosen_message() {
        // A minimal key size keeps this test fast; production use picks
        // key_bits_for_label_width(32).
        let (mut garbler_stream, mut evaluator_stream) = duplex();

        let m0 = b"false label bytes...............".to_vec();
        let m1 = b"true label bytes................".to_vec();
        let m0_clone = m0.clone();
        let m1_clone = m1.clone();

        let garbler_thread = thread::spawn(move || {
            let mut rng = ChaCha12Rng::seed_from_u64(7);
            garbler_ot(&mut garbler_stream, &mut rng, &m0_clone, &m1_clone, 256).unwrap();
        });

        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let recovered = evaluator_ot(&mut evaluator_stream, &mut rng, true).unwrap();
        garbler_thread.join().unwrap();

        assert_eq!(recovered, m1);
        assert_ne!(recovered, m0);
    }

    #[test]
    fn ot_choice_false_recovers_m0() {
        let (mut garbler_stream, mut evaluator_stream) = duplex();

        let m0 = b"zero choice recovers this message".to_vec();
        let m1 = b"one choice recovers this message!".to_vec();
        let m0_clone = m0.clone();
        let m1_clone = m1.clone();

        let garbler_thread = thread::spawn(move || {
            let mut rng = ChaCha12Rng::seed_from_u64(1);
            garbler_ot(&mut garbler_stream, &mut rng, &m0_clone, &m1_clone, 256).unwrap();
        });

        let mut rng = ChaCha12Rng::seed_from_u64(2);
        let recovered = evaluator_ot(&mut evaluator_stream, &mut rng, false).unwrap();
        garbler_thread.join().unwrap();

        assert_eq!(recovered, m0);
    }

    #[test]
    fn key_bits_for_label_width_grows_with_label_size() {
        assert_eq!(key_bits_for_label_width(16), MIN_KEY_BITS);
        assert!(key_bits_for_label_width(128) > MIN_KEY_BITS);
    }
}
