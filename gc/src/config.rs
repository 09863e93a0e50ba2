/// Label width in bytes, negotiated once per circuit (default 32).
pub const DEFAULT_NUM_BYTES: usize = 32;

/// Which of the six gate-garbling variants is active for a circuit.
///
/// Replaces the six mutually-exclusive process-wide flags of the source
/// implementation with a single tagged choice, threaded explicitly into
/// [`Circuit::build`](crate::circuit::Circuit::build) rather than read from
/// module-level statics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Optimization {
    Classical,
    PointAndPermute,
    Grr3,
    FreeXor,
    FleXor,
    HalfGates,
}

impl Optimization {
    /// Whether this variant uses point-and-permute bits at all.
    pub fn uses_pp_bits(self) -> bool {
        !matches!(self, Optimization::Classical)
    }

    /// Whether this variant requires the circuit-global free-XOR offset `R`.
    pub fn uses_free_xor_offset(self) -> bool {
        matches!(self, Optimization::FreeXor | Optimization::HalfGates)
    }
}

/// Immutable configuration threaded through circuit construction.
///
/// Built once from CLI flags (or test fixtures) and never mutated; stands in
/// for what the source implementation kept as mutable global settings.
#[derive(Debug, Clone, Copy)]
pub struct GarbleConfig {
    pub optimization: Optimization,
    pub num_bytes: usize,
}

impl GarbleConfig {
    pub fn new(optimization: Optimization) -> Self {
        GarbleConfig {
            optimization,
            num_bytes: DEFAULT_NUM_BYTES,
        }
    }

    pub fn with_num_bytes(optimization: Optimization, num_bytes: usize) -> Self {
        GarbleConfig {
            optimization,
            num_bytes,
        }
    }
}

impl Default for GarbleConfig {
    fn default() -> Self {
        GarbleConfig::new(Optimization::Classical)
    }
}

/// Seed a [`rand_chacha::ChaCha12Rng`] from OS entropy. Every party protocol
/// entry point seeds exactly one RNG this way and reuses it for the whole
/// circuit's lifetime, satisfying the "cryptographically strong
/// random source" requirement for label bytes, `R`, RSA primes, and OT
/// values.
pub fn rng_from_os_entropy() -> rand_chacha::ChaCha12Rng {
    use rand::RngCore;
    use rand::SeedableRng;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    rand_chacha::ChaCha12Rng::from_seed(seed)
}
