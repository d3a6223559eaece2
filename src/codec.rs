//! Binary model format
//!
//! ```text
//! version tag (4 bytes, "KBC\x01")
//! kmer_size (varint) | capacity (varint) | false_positive_rate (f64 LE)
//! label_count (varint)
//! repeated label_count times:
//!     label_len (varint) | label (UTF-8)
//!     num_bits (varint) | num_hashes (varint)
//!     word_count (varint) | words (u32 LE each)
//! ```
//!
//! Varints are unsigned LEB128. Bit-set words follow the [`BitSet`] layout,
//! so a loaded bank probes exactly the bits the saved one set.

use crate::{
    bitset::{self, BitSet, Word},
    bloom::BloomFilter,
    classifier::ClassifierBank,
    config::{ClassifierConfig, FilterParams},
    utils, ClassifierError, Result,
};
use std::io::{Read, Write};
use tracing::debug;

/// Version tag opening every serialized model
pub const MODEL_VERSION: [u8; 4] = *b"KBC\x01";

/// Longest valid LEB128 encoding of a u64
const MAX_VARINT_LEN: usize = 10;

/// Serialize `bank` into a new byte vector
pub fn to_bytes(bank: &ClassifierBank) -> Vec<u8> {
    let mut bytes = ModelBytes::with_capacity(64);
    let config = bank.config();

    bytes.write(&MODEL_VERSION);
    bytes.write_varint(config.kmer_size as u64);
    bytes.write_varint(config.filter.capacity as u64);
    bytes.write_f64_le(config.filter.false_positive_rate);
    bytes.write_varint(bank.len() as u64);

    for (label, filter) in bank.classes() {
        bytes.write_varint(label.len() as u64);
        bytes.write(label.as_bytes());
        bytes.write_varint(filter.num_bits() as u64);
        bytes.write_varint(filter.num_hash_functions() as u64);

        let words = filter.bits().words();
        bytes.write_varint(words.len() as u64);
        for &word in words {
            bytes.write_u32_le(word);
        }
    }

    bytes.into_bytes()
}

/// Write `bank` to `writer`
pub fn save<W: Write>(bank: &ClassifierBank, mut writer: W) -> Result<()> {
    let bytes = to_bytes(bank);
    writer.write_all(&bytes)?;
    writer.flush()?;
    debug!(bytes = bytes.len(), classes = bank.len(), "saved model");
    Ok(())
}

/// Read a bank from `reader`, consuming it to the end
pub fn load<R: Read>(mut reader: R) -> Result<ClassifierBank> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let bank = from_bytes(&bytes)?;
    debug!(bytes = bytes.len(), classes = bank.len(), "loaded model");
    Ok(bank)
}

/// Deserialize a bank from `bytes`
///
/// The whole slice must be one model; trailing bytes are an error.
pub fn from_bytes(bytes: &[u8]) -> Result<ClassifierBank> {
    let mut slice = ModelSlice::new(bytes);

    let tag = slice.read_array::<4>("version tag")?;
    if tag != MODEL_VERSION {
        return Err(corrupt(format!("unrecognized version tag {:02x?}", tag)));
    }

    let kmer_size = slice.read_len("k-mer size")?;
    let capacity = slice.read_len("capacity")?;
    let false_positive_rate = f64::from_le_bytes(slice.read_array::<8>("false positive rate")?);
    let config = ClassifierConfig {
        kmer_size,
        filter: FilterParams {
            capacity,
            false_positive_rate,
        },
    };
    config
        .validate()
        .map_err(|e| corrupt(format!("invalid stored configuration: {}", e)))?;
    // Every class filter is sized from the shared parameters
    let sizing = utils::optimal_bloom_parameters(capacity, false_positive_rate)
        .map_err(|e| corrupt(format!("invalid stored configuration: {}", e)))?;

    let label_count = slice.read_len("label count")?;
    // Each class takes at least four bytes
    if label_count > slice.remaining() / 4 {
        return Err(corrupt(format!(
            "label count {} exceeds remaining {} bytes",
            label_count,
            slice.remaining()
        )));
    }

    let mut classes = Vec::with_capacity(label_count);
    for _ in 0..label_count {
        let label_len = slice.read_len("label length")?;
        let label = std::str::from_utf8(slice.read_bytes(label_len, "label")?)
            .map_err(|e| corrupt(format!("label is not UTF-8: {}", e)))?
            .to_string();

        let num_bits = slice.read_len("bit count")?;
        let num_hashes = slice.read_len("hash count")?;
        if num_bits != sizing.optimal_num_bits || num_hashes != sizing.optimal_num_hashes {
            return Err(corrupt(format!(
                "class {:?}: filter of {} bits and {} hashes does not match the stored \
                 parameters ({} bits, {} hashes)",
                label, num_bits, num_hashes, sizing.optimal_num_bits, sizing.optimal_num_hashes
            )));
        }
        let word_count = slice.read_len("word count")?;
        if word_count != bitset::word_count(num_bits) {
            return Err(corrupt(format!(
                "class {:?}: {} words cannot hold {} bits",
                label, word_count, num_bits
            )));
        }

        let raw = slice.read_bytes(word_count.saturating_mul(4), "bit set words")?;
        let words: Vec<Word> = raw
            .chunks_exact(4)
            .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let filter = BitSet::from_words(num_bits, &words)
            .and_then(|bits| BloomFilter::from_bits(bits, num_hashes))
            .map_err(|e| corrupt(format!("class {:?}: {}", label, e)))?;
        classes.push((label, filter));
    }

    if slice.remaining() != 0 {
        return Err(corrupt(format!(
            "{} trailing bytes after last class",
            slice.remaining()
        )));
    }

    ClassifierBank::from_parts(config, classes)
}

fn corrupt(message: impl Into<String>) -> ClassifierError {
    ClassifierError::CorruptModel(message.into())
}

/// Growable output buffer for the model format
struct ModelBytes {
    bytes: Vec<u8>,
}

impl ModelBytes {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    fn write_u32_le(&mut self, n: u32) {
        self.write(&n.to_le_bytes());
    }

    fn write_f64_le(&mut self, n: f64) {
        self.write(&n.to_le_bytes());
    }

    fn write_varint(&mut self, mut n: u64) {
        while n >= 0x80 {
            self.bytes.push((n as u8) | 0x80);
            n >>= 7;
        }
        self.bytes.push(n as u8);
    }
}

/// Bounds-checked reader over a serialized model
struct ModelSlice<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ModelSlice<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(corrupt(format!(
                "truncated {}: need {} bytes, {} remaining",
                what,
                len,
                self.remaining()
            )));
        }
        let out = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self, what: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, what)?);
        Ok(out)
    }

    fn read_varint(&mut self, what: &str) -> Result<u64> {
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let byte = self.read_bytes(1, what)?[0];
            let payload = (byte & 0x7f) as u64;
            let shift = 7 * i as u32;
            if shift == 63 && payload > 1 {
                return Err(corrupt(format!("{} overflows 64 bits", what)));
            }
            value |= payload << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(corrupt(format!("{} varint longer than {} bytes", what, MAX_VARINT_LEN)))
    }

    fn read_len(&mut self, what: &str) -> Result<usize> {
        let value = self.read_varint(what)?;
        usize::try_from(value).map_err(|_| corrupt(format!("{} {} does not fit in usize", what, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Labels;

    fn trained_bank() -> ClassifierBank {
        let config = ClassifierConfig::new(3, FilterParams::new(100, 0.01).unwrap()).unwrap();
        let mut bank = ClassifierBank::new(config).unwrap();
        let labels = vec!["A".to_string(), "B".to_string()];
        bank.fit(&["AAAACCCC", "GGGGTTTT"], Labels::PerItem(&labels))
            .unwrap();
        bank
    }

    #[test]
    fn test_header_layout() {
        let bytes = to_bytes(&trained_bank());

        assert_eq!(&bytes[..4], b"KBC\x01");
        assert_eq!(bytes[4], 3); // k-mer size
        assert_eq!(bytes[5], 100); // capacity
        assert_eq!(f64::from_le_bytes(bytes[6..14].try_into().unwrap()), 0.01);
        assert_eq!(bytes[14], 2); // label count
        assert_eq!(bytes[15], 1); // label length
        assert_eq!(bytes[16], b'A');
    }

    #[test]
    fn test_round_trip() {
        let bank = trained_bank();
        let restored = from_bytes(&to_bytes(&bank)).unwrap();

        assert_eq!(restored.config(), bank.config());
        assert_eq!(
            restored.labels().collect::<Vec<_>>(),
            bank.labels().collect::<Vec<_>>()
        );
        for (label, filter) in bank.classes() {
            assert_eq!(restored.filter(label), Some(filter));
        }
    }

    #[test]
    fn test_save_and_load_streams() {
        let bank = trained_bank();
        let mut buffer = Vec::new();
        save(&bank, &mut buffer).unwrap();

        let restored = load(buffer.as_slice()).unwrap();
        assert_eq!(
            restored.predict_proba(&["AAAACCCC", "GGGGTT"]),
            bank.predict_proba(&["AAAACCCC", "GGGGTT"])
        );
    }

    #[test]
    fn test_empty_bank_round_trip() {
        let bank = ClassifierBank::new(ClassifierConfig::default()).unwrap();
        let restored = from_bytes(&to_bytes(&bank)).unwrap();
        assert!(restored.is_empty());
        assert_eq!(restored.config(), bank.config());
    }

    #[test]
    fn test_varint_encoding() {
        let mut bytes = ModelBytes::with_capacity(16);
        bytes.write_varint(300);
        bytes.write_varint(u64::MAX);
        let bytes = bytes.into_bytes();
        assert_eq!(&bytes[..2], &[0xac, 0x02]);

        let mut slice = ModelSlice::new(&bytes);
        assert_eq!(slice.read_varint("a").unwrap(), 300);
        assert_eq!(slice.read_varint("b").unwrap(), u64::MAX);
        assert_eq!(slice.remaining(), 0);
    }

    #[test]
    fn test_varint_overflow_rejected() {
        let too_long = [0xffu8; 11];
        assert!(ModelSlice::new(&too_long).read_varint("x").is_err());

        let mut overflow = [0xffu8; 10];
        overflow[9] = 0x02;
        assert!(ModelSlice::new(&overflow).read_varint("x").is_err());
    }

    #[test]
    fn test_bad_version_rejected() {
        let mut bytes = to_bytes(&trained_bank());
        bytes[3] = 0x02;
        assert!(matches!(
            from_bytes(&bytes),
            Err(ClassifierError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_truncated_rejected() {
        let bytes = to_bytes(&trained_bank());
        for len in [0, 3, 10, 16, bytes.len() - 1] {
            assert!(
                matches!(from_bytes(&bytes[..len]), Err(ClassifierError::CorruptModel(_))),
                "prefix of {} bytes should be corrupt",
                len
            );
        }
    }

    #[test]
    fn test_filter_size_must_match_config() {
        let mut bytes = to_bytes(&trained_bank());
        // Bit count of the first class: 959 -> 958
        assert_eq!(&bytes[17..19], &[0xbf, 0x07]);
        bytes[17] = 0xbe;
        assert!(matches!(
            from_bytes(&bytes),
            Err(ClassifierError::CorruptModel(_))
        ));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = to_bytes(&trained_bank());
        bytes.push(0);
        assert!(matches!(
            from_bytes(&bytes),
            Err(ClassifierError::CorruptModel(_))
        ));
    }
}
