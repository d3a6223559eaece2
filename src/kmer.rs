//! Sliding-window k-mer extraction
//!
//! A k-mer is a contiguous window of `k` symbols taken with stride 1. A
//! sequence of length `L >= k` yields `L - k + 1` k-mers; shorter sequences
//! yield none.

use crate::{ClassifierError, Result};
use fnv::FnvHashSet;
use std::slice::Windows;

/// Extracts fixed-length k-mers from byte sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerExtractor {
    k: usize,
}

impl KmerExtractor {
    /// Create an extractor for k-mers of length `k` (must be >= 1)
    pub fn new(k: usize) -> Result<Self> {
        if k == 0 {
            return Err(ClassifierError::Configuration(
                "K-mer size must be > 0".to_string(),
            ));
        }
        Ok(KmerExtractor { k })
    }

    /// K-mer length
    pub fn k(&self) -> usize {
        self.k
    }

    /// All k-mers of `sequence` in order, repeats included
    pub fn extract<'a>(&self, sequence: &'a [u8]) -> Kmers<'a> {
        Kmers {
            windows: sequence.windows(self.k),
        }
    }

    /// The distinct k-mers of `sequence`
    pub fn unique<'a>(&self, sequence: &'a [u8]) -> FnvHashSet<&'a [u8]> {
        self.extract(sequence).collect()
    }
}

/// Lazy iterator over the k-mers of one sequence
///
/// Clone before consuming to walk the same k-mers twice, or call
/// [`KmerExtractor::extract`] again.
#[derive(Debug, Clone)]
pub struct Kmers<'a> {
    windows: Windows<'a, u8>,
}

impl<'a> Iterator for Kmers<'a> {
    type Item = &'a [u8];

    #[inline]
    fn next(&mut self) -> Option<&'a [u8]> {
        self.windows.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

impl ExactSizeIterator for Kmers<'_> {}
