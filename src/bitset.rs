//! Fixed-size bit array backing each class filter
//!
//! Bits live in 32-bit words, least significant bit first: bit `i` is bit
//! `i % 32` of word `i / 32`. This layout is what the model codec persists.

use crate::{ClassifierError, Result};
use bit_vec::BitVec;

/// Storage word of a [`BitSet`]
pub type Word = u32;

/// Number of bits per storage word
pub const WORD_BITS: usize = Word::BITS as usize;

/// A fixed-size set of bits supporting O(1) set and test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitSet {
    bits: BitVec<Word>,
}

impl BitSet {
    /// Create a zeroed bit set of `num_bits` bits
    pub fn new(num_bits: usize) -> Result<Self> {
        if num_bits == 0 {
            return Err(ClassifierError::Configuration(
                "Bit set size must be > 0".to_string(),
            ));
        }

        Ok(BitSet {
            bits: BitVec::from_elem(num_bits, false),
        })
    }

    /// Rebuild a bit set from its raw storage words
    ///
    /// `words` must hold exactly `ceil(num_bits / 32)` words and no bit at an
    /// index `>= num_bits` may be set.
    pub fn from_words(num_bits: usize, words: &[Word]) -> Result<Self> {
        if words.len() != word_count(num_bits) {
            return Err(ClassifierError::Configuration(format!(
                "Expected {} words for {} bits, got {}",
                word_count(num_bits),
                num_bits,
                words.len()
            )));
        }

        let mut set = Self::new(num_bits)?;
        for (w, &word) in words.iter().enumerate() {
            let mut rest = word;
            while rest != 0 {
                let index = w * WORD_BITS + rest.trailing_zeros() as usize;
                if index >= num_bits {
                    return Err(ClassifierError::Configuration(format!(
                        "Bit {} set beyond bit set size {}",
                        index, num_bits
                    )));
                }
                set.bits.set(index, true);
                rest &= rest - 1;
            }
        }

        Ok(set)
    }

    /// Set bit `index`; `index` must be below [`BitSet::len`]
    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.bits.len());
        self.bits.set(index, true);
    }

    /// Test bit `index`; out-of-range indices read as unset
    #[inline]
    pub fn test(&self, index: usize) -> bool {
        self.bits.get(index).unwrap_or(false)
    }

    /// Number of bits (`m`)
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Always false: a bit set holds at least one bit
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words().iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Raw storage words, in index order
    pub fn words(&self) -> &[Word] {
        self.bits.storage()
    }
}

/// Number of storage words needed for `num_bits` bits
pub fn word_count(num_bits: usize) -> usize {
    num_bits.div_ceil(WORD_BITS)
}
