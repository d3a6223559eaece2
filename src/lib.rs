//! # Ferric Kmer
//!
//! A multi-class sequence classifier built from per-class Bloom filters over
//! k-mers. Each class learns a compact probabilistic set of the k-mers in its
//! training sequences; a query is scored by the fraction of its distinct
//! k-mers each class filter accepts.

pub mod bitset;
pub mod bloom;
pub mod classifier;
pub mod codec;
pub mod config;
pub mod hash;
pub mod kmer;
pub mod utils;

pub use bitset::BitSet;
pub use bloom::{BloomFilter, BloomStats};
pub use classifier::{ClassifierBank, Labels};
pub use config::{ClassifierConfig, FilterParams};
pub use hash::{HashFamily, HashFunction, SeededFnv};
pub use kmer::{KmerExtractor, Kmers};

// Python bindings
#[cfg(feature = "python")]
pub mod python_module;

/// Common error types for the library
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("one of label-per-item or a single class label must be provided")]
    MissingLabel,

    #[error("Label count mismatch: {labels} labels for {items} items")]
    LabelCountMismatch { labels: usize, items: usize },

    #[error("Corrupt model: {0}")]
    CorruptModel(String),

    #[error("Classifier has no classes; fit it before predicting")]
    NotFitted,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
