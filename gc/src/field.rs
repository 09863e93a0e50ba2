//! Polynomial arithmetic over GF(2) modulo a fixed irreducible polynomial,
//! used by the GRR2/FleXOR polynomial tricks.
//!
//! Polynomials are represented as MSB-first bit vectors (the same
//! representation as [`crate::bits::bytes_to_poly`]), and arithmetic
//! reduces modulo a degree-`k` irreducible drawn from a fixed table keyed
//! by `k`.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Degrees for which an irreducible polynomial is bundled, matching the
/// label widths (in bits) the protocol can be configured with.
const SUPPORTED_DEGREES: [usize; 9] = [1, 2, 4, 8, 16, 32, 64, 128, 256];

fn irreducible_table() -> &'static HashMap<usize, Vec<u8>> {
    static TABLE: OnceLock<HashMap<usize, Vec<u8>>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        // x + 1
        table.insert(1, vec![1, 1]);
        // x^2 + x + 1
        table.insert(2, vec![1, 1, 1]);
        // x^4 + x + 1
        table.insert(4, vec![1, 0, 0, 1, 1]);
        // x^8 + x^4 + x^3 + x + 1 (AES's field)
        table.insert(8, vec![1, 0, 0, 0, 1, 1, 0, 1, 1]);
        // x^16 + x^5 + x^3 + x + 1
        let mut p16 = vec![0u8; 17];
        p16[0] = 1;
        p16[11] = 1;
        p16[13] = 1;
        p16[15] = 1;
        p16[16] = 1;
        table.insert(16, p16);
        // x^32 + x^7 + x^3 + x^2 + 1
        let mut p32 = vec![0u8; 33];
        p32[0] = 1;
        p32[25] = 1;
        p32[29] = 1;
        p32[30] = 1;
        p32[32] = 1;
        table.insert(32, p32);
        // x^64 + x^4 + x^3 + x + 1
        let mut p64 = vec![0u8; 65];
        p64[0] = 1;
        p64[60] = 1;
        p64[61] = 1;
        p64[63] = 1;
        p64[64] = 1;
        table.insert(64, p64);
        // x^128 + x^7 + x^2 + x + 1 (GCM's field)
        let mut p128 = vec![0u8; 129];
        p128[0] = 1;
        p128[121] = 1;
        p128[126] = 1;
        p128[127] = 1;
        p128[128] = 1;
        table.insert(128, p128);
        // x^256 + x^10 + x^5 + x^2 + 1
        let mut p256 = vec![0u8; 257];
        p256[0] = 1;
        p256[246] = 1;
        p256[251] = 1;
        p256[254] = 1;
        p256[256] = 1;
        table.insert(256, p256);
        table
    })
}

/// Look up the irreducible polynomial of degree `k`, MSB first, length `k+1`.
pub fn irreducible_polynomial(k: usize) -> Option<&'static [u8]> {
    irreducible_table().get(&k).map(Vec::as_slice)
}

pub fn is_supported_degree(k: usize) -> bool {
    SUPPORTED_DEGREES.contains(&k)
}

fn trim(poly: &[u8]) -> Vec<u8> {
    let first_nonzero = poly.iter().position(|&b| b != 0);
    match first_nonzero {
        Some(i) => poly[i..].to_vec(),
        None => vec![0],
    }
}

fn degree(poly: &[u8]) -> isize {
    let trimmed = trim(poly);
    if trimmed == [0] {
        -1
    } else {
        trimmed.len() as isize - 1
    }
}

/// GF(2) polynomial addition (= subtraction = XOR), padding the shorter
/// operand with leading zeros.
pub fn add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().max(b.len());
    let mut result = vec![0u8; len];
    for i in 0..a.len() {
        result[len - a.len() + i] ^= a[i];
    }
    for i in 0..b.len() {
        result[len - b.len() + i] ^= b[i];
    }
    trim(&result)
}

/// Alias for [`add`]: subtraction is XOR in GF(2).
pub fn sub(a: &[u8], b: &[u8]) -> Vec<u8> {
    add(a, b)
}

/// Polynomial multiplication without reduction.
pub fn mul_raw(a: &[u8], b: &[u8]) -> Vec<u8> {
    if degree(a) < 0 || degree(b) < 0 {
        return vec![0];
    }
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        if ai == 0 {
            continue;
        }
        for (j, &bj) in b.iter().enumerate() {
            result[i + j] ^= ai & bj;
        }
    }
    trim(&result)
}

/// Polynomial division: returns (quotient, remainder).
pub fn div_rem(a: &[u8], divisor: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut remainder = trim(a);
    let divisor = trim(divisor);
    let div_deg = degree(&divisor);
    if div_deg < 0 {
        panic!("division by zero polynomial");
    }
    let mut quotient = vec![0u8; 1];
    while degree(&remainder) >= div_deg {
        let shift = (degree(&remainder) - div_deg) as usize;
        let mut term = vec![0u8; shift + 1];
        term[0] = 1;
        let shifted_divisor = mul_raw(&divisor, &term);
        remainder = add(&remainder, &shifted_divisor);
        quotient = add(&quotient, &term);
    }
    (quotient, remainder)
}

/// Multiplication modulo the irreducible polynomial of degree `k`.
pub fn mul(a: &[u8], b: &[u8], k: usize) -> Vec<u8> {
    let modulus = irreducible_polynomial(k).expect("unsupported field degree");
    let product = mul_raw(a, b);
    let (_, remainder) = div_rem(&product, modulus);
    remainder
}

/// Multiplicative inverse modulo the irreducible polynomial of degree `k`,
/// via the extended Euclidean algorithm. Returns `None` for the zero
/// polynomial.
pub fn inv(a: &[u8], k: usize) -> Option<Vec<u8>> {
    let modulus = irreducible_polynomial(k).expect("unsupported field degree");
    if degree(a) < 0 {
        return None;
    }
    let (mut old_r, mut r) = (modulus.to_vec(), trim(a));
    let (mut old_s, mut s) = (vec![0u8], vec![1u8]);

    while degree(&r) >= 0 {
        let (q, rem) = div_rem(&old_r, &r);
        old_r = r;
        r = rem;
        let new_s = add(&old_s, &mul_raw(&q, &s));
        old_s = s;
        s = new_s;
    }
    if degree(&old_r) != 0 {
        return None;
    }
    Some(old_s)
}

/// Evaluate a polynomial (MSB-first coefficients) at a field point via
/// Horner's rule, all arithmetic modulo degree-`k` irreducible.
pub fn evaluate_polynomial(coefficients: &[Vec<u8>], x: &[u8], k: usize) -> Vec<u8> {
    let mut result = vec![0u8];
    for coeff in coefficients {
        result = add(&mul(&result, x, k), coeff);
    }
    result
}

/// Lagrange interpolation: given points `(X[i], Y[i])`, return the unique
/// degree-`<len(X)` polynomial through them, as MSB-first coefficients.
pub fn interpolate(xs: &[Vec<u8>], ys: &[Vec<u8>], k: usize) -> Vec<Vec<u8>> {
    assert_eq!(xs.len(), ys.len());
    let n = xs.len();
    let mut result = vec![vec![0u8]];

    for i in 0..n {
        // basis_i(x) = prod_{j != i} (x - x_j) / (x_i - x_j)
        let mut numerator = vec![vec![1u8]]; // polynomial "1", as coefficient list [1]
        let mut denom = vec![1u8];
        for j in 0..n {
            if j == i {
                continue;
            }
            // (x - x_j) == (x + x_j) in GF(2)
            let term = vec![vec![1u8], xs[j].clone()]; // represents x + x_j as coeffs [1, x_j]
            numerator = poly_mul_coeffs(&numerator, &term, k);
            denom = mul(&denom, &sub(&xs[i], &xs[j]), k);
        }
        let denom_inv = inv(&denom, k).expect("interpolation nodes must be distinct");
        let scaled: Vec<Vec<u8>> = numerator
            .iter()
            .map(|c| mul(c, &denom_inv, k))
            .map(|c| mul(&c, &ys[i], k))
            .collect();
        result = poly_add_coeffs(&result, &scaled);
    }
    result
}

fn poly_add_coeffs(a: &[Vec<u8>], b: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let len = a.len().max(b.len());
    let mut result = vec![vec![0u8]; len];
    for i in 0..a.len() {
        result[len - a.len() + i] = add(&result[len - a.len() + i], &a[i]);
    }
    for i in 0..b.len() {
        result[len - b.len() + i] = add(&result[len - b.len() + i], &b[i]);
    }
    result
}

fn poly_mul_coeffs(a: &[Vec<u8>], b: &[Vec<u8>], k: usize) -> Vec<Vec<u8>> {
    let mut result = vec![vec![0u8]; a.len() + b.len() - 1];
    for (i, ai) in a.iter().enumerate() {
        for (j, bj) in b.iter().enumerate() {
            let term = mul(ai, bj, k);
            result[i + j] = add(&result[i + j], &term);
        }
    }
    result
}
