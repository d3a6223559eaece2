//! Hash functions for Bloom filters
//!
//! Probe positions come from double hashing: two seeded 64-bit hashes `h1`,
//! `h2` of the item, combined as `(h1 + i * h2) mod m` for probe `i`.
//! Everything here is a pure function of its input so that probe positions
//! survive a save/load round trip.

use fnv::FnvHasher;
use std::hash::Hasher;

/// Seed of the first hash (the standard FNV-1a 64-bit offset basis)
pub const FIRST_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Seed of the second hash
pub const SECOND_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Trait for hash functions used in Bloom filters
pub trait HashFunction: Send + Sync {
    /// Hash a byte string to 64 bits
    fn hash(&self, key: &[u8]) -> u64;

    /// Get a name/identifier for this hash function
    fn name(&self) -> String;
}

/// FNV-1a keyed with a seed, followed by a 64-bit avalanche finalizer
///
/// FNV alone mixes the last bytes poorly; the finalizer spreads every input
/// bit over the whole output word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededFnv {
    seed: u64,
}

impl SeededFnv {
    pub const fn new(seed: u64) -> Self {
        SeededFnv { seed }
    }
}

impl HashFunction for SeededFnv {
    fn hash(&self, key: &[u8]) -> u64 {
        let mut hasher = FnvHasher::with_key(self.seed);
        hasher.write(key);
        mix64(hasher.finish())
    }

    fn name(&self) -> String {
        format!("fnv1a-mix{:016x}", self.seed)
    }
}

/// MurmurHash3 `fmix64` finalizer
#[inline]
pub fn mix64(mut x: u64) -> u64 {
    x ^= x >> 33;
    x = x.wrapping_mul(0xff51_afd7_ed55_8ccd);
    x ^= x >> 33;
    x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    x ^= x >> 33;
    x
}

/// Derives `k` probe indices over `[0, m)` from two base hashes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashFamily<H = SeededFnv> {
    first: H,
    second: H,
}

impl Default for HashFamily<SeededFnv> {
    fn default() -> Self {
        HashFamily::new(SeededFnv::new(FIRST_SEED), SeededFnv::new(SECOND_SEED))
    }
}

impl<H: HashFunction> HashFamily<H> {
    /// Combine two independent hash functions into a family
    pub fn new(first: H, second: H) -> Self {
        HashFamily { first, second }
    }

    /// Lazily yield the `num_probes` probe indices of `item` over `[0, num_bits)`
    pub fn probes(&self, item: &[u8], num_probes: usize, num_bits: usize) -> Probes {
        debug_assert!(num_bits > 0);
        Probes {
            h1: self.first.hash(item),
            h2: self.second.hash(item),
            next: 0,
            num_probes: num_probes as u64,
            num_bits: num_bits as u64,
        }
    }

    /// Identifier of both underlying hash functions
    pub fn name(&self) -> String {
        format!("{}+{}", self.first.name(), self.second.name())
    }

    /// Collect the `num_probes` probe indices of `item`
    pub fn probe_indices(&self, item: &[u8], num_probes: usize, num_bits: usize) -> Vec<usize> {
        self.probes(item, num_probes, num_bits).collect()
    }
}

/// Iterator over the probe indices of one item
#[derive(Debug, Clone)]
pub struct Probes {
    h1: u64,
    h2: u64,
    next: u64,
    num_probes: u64,
    num_bits: u64,
}

impl Iterator for Probes {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.next >= self.num_probes {
            return None;
        }
        let combined = self.h1.wrapping_add(self.next.wrapping_mul(self.h2));
        self.next += 1;
        Some((combined % self.num_bits) as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.num_probes - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Probes {}
