//! Standard Bloom filter implementation
//!
//! A space-efficient probabilistic data structure for membership testing.
//! One filter is kept per class label; items are the k-mers of that class.

use crate::{bitset::BitSet, hash::HashFamily, utils, ClassifierError, Result};

/// A standard Bloom filter over byte strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// Bit array storing the filter data
    bits: BitSet,
    /// Number of probes per item
    num_hashes: usize,
    /// Probe index derivation
    hashes: HashFamily,
}

impl BloomFilter {
    /// Create a new Bloom filter
    ///
    /// # Arguments
    /// * `capacity` - Expected number of elements to insert (`n`)
    /// * `fpr` - Target false positive rate at capacity (`p`)
    ///
    /// Bit count and probe count are derived with
    /// [`utils::optimal_bloom_parameters`].
    pub fn new(capacity: usize, fpr: f64) -> Result<Self> {
        let params = utils::optimal_bloom_parameters(capacity, fpr)?;
        Self::with_size(params.optimal_num_bits, params.optimal_num_hashes)
    }

    /// Create a Bloom filter with specific parameters
    pub fn with_size(bit_count: usize, num_hashes: usize) -> Result<Self> {
        if num_hashes == 0 {
            return Err(ClassifierError::Configuration(
                "Number of hashes must be > 0".to_string(),
            ));
        }

        Ok(BloomFilter {
            bits: BitSet::new(bit_count)?,
            num_hashes,
            hashes: HashFamily::default(),
        })
    }

    /// Rebuild a filter from a previously populated bit set
    pub fn from_bits(bits: BitSet, num_hashes: usize) -> Result<Self> {
        if num_hashes == 0 {
            return Err(ClassifierError::Configuration(
                "Number of hashes must be > 0".to_string(),
            ));
        }

        Ok(BloomFilter {
            bits,
            num_hashes,
            hashes: HashFamily::default(),
        })
    }

    /// Insert an item into the filter
    pub fn insert(&mut self, item: &[u8]) {
        let bit_count = self.bits.len();
        for index in self.hashes.probes(item, self.num_hashes, bit_count) {
            self.bits.set(index);
        }
    }

    /// Check if an item might be in the filter
    /// Returns true if the item might be present (with possible false positives)
    /// Returns false if the item is definitely not present
    pub fn contains(&self, item: &[u8]) -> bool {
        self.hashes
            .probes(item, self.num_hashes, self.bits.len())
            .all(|index| self.bits.test(index))
    }

    /// Get the current load factor (fraction of bits set)
    pub fn load_factor(&self) -> f64 {
        self.bits.count_ones() as f64 / self.bits.len() as f64
    }

    /// Get the estimated false positive rate
    pub fn estimated_fpr(&self) -> f64 {
        self.load_factor().powi(self.num_hashes as i32)
    }

    /// Estimate the number of distinct items inserted from the set-bit count
    ///
    /// Saturated filters report `f64::INFINITY`.
    pub fn estimated_len(&self) -> f64 {
        let m = self.bits.len() as f64;
        let set = self.bits.count_ones() as f64;
        if set >= m {
            return f64::INFINITY;
        }
        -(m / self.num_hashes as f64) * (1.0 - set / m).ln()
    }

    /// Get statistics about the filter
    pub fn stats(&self) -> BloomStats {
        BloomStats {
            num_bits: self.bits.len(),
            num_hash_functions: self.num_hashes,
            estimated_elements: self.estimated_len(),
            load_factor: self.load_factor(),
            estimated_fpr: self.estimated_fpr(),
        }
    }

    /// Get the number of bits (`m`)
    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    /// Get the number of probes per item (`k`)
    pub fn num_hash_functions(&self) -> usize {
        self.num_hashes
    }

    /// Borrow the underlying bit set
    pub fn bits(&self) -> &BitSet {
        &self.bits
    }

    /// Hash family deriving the probe indices
    pub fn hash_family(&self) -> &HashFamily {
        &self.hashes
    }
}

/// Statistics about a Bloom filter
#[derive(Debug, Clone)]
pub struct BloomStats {
    pub num_bits: usize,
    pub num_hash_functions: usize,
    pub estimated_elements: f64,
    pub load_factor: f64,
    pub estimated_fpr: f64,
}

impl std::fmt::Display for BloomStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "BloomFilter Stats:\n\
             - Size: {} bits\n\
             - Hash functions: {}\n\
             - Estimated elements: {:.0}\n\
             - Load factor: {:.3}\n\
             - Estimated FPR: {:.6}",
            self.num_bits,
            self.num_hash_functions,
            self.estimated_elements,
            self.load_factor,
            self.estimated_fpr
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_filter_basic() {
        let mut bloom = BloomFilter::new(1000, 0.01).unwrap();

        bloom.insert(b"ACG");
        bloom.insert(b"CGT");
        bloom.insert(b"GTA");

        assert!(bloom.contains(b"ACG"));
        assert!(bloom.contains(b"CGT"));
        assert!(bloom.contains(b"GTA"));

        assert!(bloom.load_factor() > 0.0);
    }

    #[test]
    fn test_bloom_filter_sizing() {
        let bloom = BloomFilter::new(100, 0.01).unwrap();
        assert_eq!(bloom.num_bits(), 959);
        assert_eq!(bloom.num_hash_functions(), 7);
    }

    #[test]
    fn test_bloom_filter_false_negatives() {
        let mut bloom = BloomFilter::new(1000, 0.01).unwrap();

        // Empty filter contains nothing
        let item = b"TTTTGGGG";
        assert!(!bloom.contains(item));

        bloom.insert(item);
        assert!(bloom.contains(item));
    }

    #[test]
    fn test_invalid_construction() {
        assert!(BloomFilter::new(0, 0.01).is_err());
        assert!(BloomFilter::new(10, 0.0).is_err());
        assert!(BloomFilter::new(10, 1.5).is_err());
        assert!(BloomFilter::with_size(0, 3).is_err());
        assert!(BloomFilter::with_size(64, 0).is_err());
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut once = BloomFilter::new(500, 0.01).unwrap();
        let mut many = once.clone();

        once.insert(b"AAAC");
        for _ in 0..5 {
            many.insert(b"AAAC");
        }

        assert_eq!(once, many);
    }

    #[test]
    fn test_bloom_filter_stats() {
        let mut bloom = BloomFilter::new(1000, 0.01).unwrap();

        for i in 0..100 {
            bloom.insert(format!("kmer-{}", i).as_bytes());
        }

        let stats = bloom.stats();
        assert_eq!(stats.num_hash_functions, 7);
        assert!(stats.load_factor > 0.0);
        assert!(stats.estimated_fpr > 0.0);
        // Cardinality estimate should land near the true count
        assert!((80.0..120.0).contains(&stats.estimated_elements));
        assert!(stats.to_string().contains("Hash functions: 7"));
    }

    #[test]
    fn test_from_bits_preserves_membership() {
        let mut bloom = BloomFilter::with_size(256, 3).unwrap();
        bloom.insert(b"GATTACA");

        let rebuilt = BloomFilter::from_bits(bloom.bits().clone(), 3).unwrap();
        assert!(rebuilt.contains(b"GATTACA"));
        assert_eq!(rebuilt, bloom);
    }
}
