//! Utility functions for Bloom filters

use crate::{ClassifierError, Result};
use std::f64::consts::LN_2;

/// Largest bit count a single filter may be sized to (128 GiB of storage)
pub const MAX_NUM_BITS: u64 = 1 << 40;

/// Calculate optimal Bloom filter parameters
#[derive(Debug, Clone, PartialEq)]
pub struct BloomParameters {
    pub optimal_num_bits: usize,
    pub optimal_num_hashes: usize,
    pub expected_fpr: f64,
}

/// Calculate Bloom filter parameters for `expected_elements` items at `desired_fpr`
///
/// `m = ceil(-n * ln(p) / (ln 2)^2)` and `k = max(1, round((m / n) * ln 2))`.
/// Out-of-range inputs, and inputs whose `m` exceeds [`MAX_NUM_BITS`], are
/// rejected rather than clamped.
pub fn optimal_bloom_parameters(expected_elements: usize, desired_fpr: f64) -> Result<BloomParameters> {
    validate_capacity(expected_elements)?;
    validate_fpr(desired_fpr)?;

    let n = expected_elements as f64;
    let p = desired_fpr;

    let optimal_bits = (-(n * p.ln()) / (LN_2 * LN_2)).ceil();
    if optimal_bits > MAX_NUM_BITS as f64 {
        return Err(ClassifierError::Configuration(format!(
            "Capacity {} at false positive rate {} needs {} bits, above the limit of {}",
            expected_elements, desired_fpr, optimal_bits, MAX_NUM_BITS
        )));
    }
    let num_bits = usize::try_from(optimal_bits as u64)
        .map_err(|_| {
            ClassifierError::Configuration(format!(
                "{} bits do not fit in usize on this platform",
                optimal_bits
            ))
        })?
        .max(1);

    let m = num_bits as f64;
    let num_hashes = (((m / n) * LN_2).round() as usize).max(1);

    Ok(BloomParameters {
        optimal_num_bits: num_bits,
        optimal_num_hashes: num_hashes,
        expected_fpr: expected_fpr(num_bits, num_hashes, expected_elements),
    })
}

/// Expected false positive rate `(1 - e^(-kn/m))^k` after `n` insertions
pub fn expected_fpr(num_bits: usize, num_hashes: usize, elements: usize) -> f64 {
    let k = num_hashes as f64;
    (1.0 - (-k * elements as f64 / num_bits as f64).exp()).powi(num_hashes as i32)
}

fn validate_capacity(expected_elements: usize) -> Result<()> {
    if expected_elements == 0 {
        return Err(ClassifierError::Configuration(
            "Capacity must be > 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_fpr(desired_fpr: f64) -> Result<()> {
    // NaN fails both comparisons
    if !(desired_fpr > 0.0 && desired_fpr < 1.0) {
        return Err(ClassifierError::Configuration(format!(
            "False positive rate must be in (0, 1), got {}",
            desired_fpr
        )));
    }
    Ok(())
}
