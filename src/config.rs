//! Classifier configuration
//!
//! # Example
//!
//! ```
//! use ferric_kmer::{ClassifierConfig, FilterParams};
//!
//! let config = ClassifierConfig::new(3, FilterParams::new(100, 0.01).unwrap()).unwrap();
//! assert_eq!(config.kmer_size, 3);
//! ```

use crate::{utils, ClassifierError, Result};
use serde::{Deserialize, Serialize};

/// Sizing parameters shared by every class filter of a bank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Expected number of distinct k-mers per class (`n`)
    pub capacity: usize,
    /// Target false positive rate at capacity (`p`)
    pub false_positive_rate: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            false_positive_rate: 0.01,
        }
    }
}

impl FilterParams {
    /// Create validated filter parameters
    pub fn new(capacity: usize, false_positive_rate: f64) -> Result<Self> {
        let params = Self {
            capacity,
            false_positive_rate,
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject parameters no filter can be sized from
    pub fn validate(&self) -> Result<()> {
        utils::optimal_bloom_parameters(self.capacity, self.false_positive_rate).map(|_| ())
    }
}

/// K-mer size plus filter sizing for a classifier bank
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// K-mer length (`k`)
    pub kmer_size: usize,
    /// Parameters for filters created during training
    pub filter: FilterParams,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kmer_size: 21,
            filter: FilterParams::default(),
        }
    }
}

impl ClassifierConfig {
    /// Create a new configuration with validation
    pub fn new(kmer_size: usize, filter: FilterParams) -> Result<Self> {
        let config = Self { kmer_size, filter };
        config.validate()?;
        Ok(config)
    }

    /// Reject a zero k-mer size or invalid filter parameters
    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 {
            return Err(ClassifierError::Configuration(
                "K-mer size must be > 0".to_string(),
            ));
        }
        self.filter.validate()
    }
}
