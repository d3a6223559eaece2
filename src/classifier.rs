//! Multi-class k-mer classifier
//!
//! A [`ClassifierBank`] keeps one Bloom filter per class label. Training
//! inserts every k-mer of each item into its class filter; inference scores
//! a query by the fraction of its distinct k-mers each class filter accepts.
//!
//! Labels are kept in first-seen order. That order is the column order of
//! [`ClassifierBank::predict_proba`] and breaks ties in
//! [`ClassifierBank::predict`].
//!
//! Training needs `&mut self` and inference only `&self`, so sharing a bank
//! behind an `RwLock` gives the single-writer, many-reader discipline.

use crate::{
    bloom::BloomFilter, config::ClassifierConfig, kmer::KmerExtractor, ClassifierError, Result,
};
use fnv::FnvHashMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Class labels for a training batch
#[derive(Debug, Clone, Copy)]
pub enum Labels<'a> {
    /// One label per item, in item order
    PerItem(&'a [String]),
    /// A single label applied to every item
    Single(&'a str),
}

impl<'a> Labels<'a> {
    /// Resolve the optional per-item and single-label arguments of a fit call
    ///
    /// Per-item labels take precedence when both are given.
    pub fn from_options(per_item: Option<&'a [String]>, single: Option<&'a str>) -> Result<Self> {
        match (per_item, single) {
            (Some(labels), _) => Ok(Labels::PerItem(labels)),
            (None, Some(label)) => Ok(Labels::Single(label)),
            (None, None) => Err(ClassifierError::MissingLabel),
        }
    }

    fn get(&self, index: usize) -> &'a str {
        match *self {
            Labels::PerItem(labels) => labels[index].as_str(),
            Labels::Single(label) => label,
        }
    }
}

/// Per-class Bloom filters plus the fit/predict logic tying them together
#[derive(Debug, Clone)]
pub struct ClassifierBank {
    config: ClassifierConfig,
    extractor: KmerExtractor,
    /// Labels and their filters, in first-seen order
    classes: Vec<(String, BloomFilter)>,
    /// Label -> position in `classes`
    index: FnvHashMap<String, usize>,
}

impl ClassifierBank {
    /// Create an empty bank
    pub fn new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(ClassifierBank {
            extractor: KmerExtractor::new(config.kmer_size)?,
            config,
            classes: Vec::new(),
            index: FnvHashMap::default(),
        })
    }

    /// Rebuild a bank from already populated filters
    pub(crate) fn from_parts(
        config: ClassifierConfig,
        classes: Vec<(String, BloomFilter)>,
    ) -> Result<Self> {
        let mut bank = Self::new(config)?;
        for (label, filter) in classes {
            if bank.index.contains_key(&label) {
                return Err(ClassifierError::CorruptModel(format!(
                    "Duplicate class label {:?}",
                    label
                )));
            }
            bank.register(label, filter);
        }
        Ok(bank)
    }

    /// Adopt a new configuration, discarding every learned class
    pub fn reconfigure(&mut self, config: ClassifierConfig) -> Result<()> {
        *self = Self::new(config)?;
        Ok(())
    }

    /// Forget every class and train from scratch on `items`
    pub fn fit<S: AsRef<[u8]>>(&mut self, items: &[S], labels: Labels<'_>) -> Result<()> {
        check_label_count(items.len(), &labels)?;
        self.classes.clear();
        self.index.clear();
        self.partial_fit(items, labels)
    }

    /// Train from scratch under `config`
    ///
    /// The bank is replaced only if training succeeds; on error it keeps its
    /// previous configuration and classes.
    pub fn fit_with_config<S: AsRef<[u8]>>(
        &mut self,
        config: ClassifierConfig,
        items: &[S],
        labels: Labels<'_>,
    ) -> Result<()> {
        let mut fresh = Self::new(config)?;
        fresh.fit(items, labels)?;
        *self = fresh;
        Ok(())
    }

    /// Train on `items`, keeping previously learned classes
    ///
    /// Classes seen for the first time get a fresh filter sized from the
    /// bank's [`FilterParams`](crate::FilterParams).
    pub fn partial_fit<S: AsRef<[u8]>>(&mut self, items: &[S], labels: Labels<'_>) -> Result<()> {
        check_label_count(items.len(), &labels)?;

        for (i, item) in items.iter().enumerate() {
            let slot = self.slot_for(labels.get(i))?;
            let filter = &mut self.classes[slot].1;
            for kmer in self.extractor.extract(item.as_ref()) {
                filter.insert(kmer);
            }
        }

        info!(
            items = items.len(),
            classes = self.classes.len(),
            "partial fit complete"
        );
        for label in self.saturated_labels() {
            warn!(
                label = %label,
                capacity = self.config.filter.capacity,
                "class filter exceeds capacity; false positive bound no longer holds"
            );
        }
        Ok(())
    }

    /// Hit-rate vector of one query, in label order
    ///
    /// Queries shorter than the k-mer size score 0.0 for every class.
    pub fn score(&self, query: &[u8]) -> Vec<f64> {
        let kmers = self.extractor.unique(query);
        if kmers.is_empty() {
            return vec![0.0; self.classes.len()];
        }

        let total = kmers.len() as f64;
        self.classes
            .iter()
            .map(|(_, filter)| {
                let hits = kmers.iter().filter(|kmer| filter.contains(kmer)).count();
                hits as f64 / total
            })
            .collect()
    }

    /// Hit-rate vectors for every query, scored in parallel
    pub fn predict_proba<S: AsRef<[u8]> + Sync>(&self, queries: &[S]) -> Vec<Vec<f64>> {
        queries
            .par_iter()
            .map(|query| self.score(query.as_ref()))
            .collect()
    }

    /// Most likely label for every query
    ///
    /// Ties go to the label seen first during training.
    pub fn predict<S: AsRef<[u8]> + Sync>(&self, queries: &[S]) -> Result<Vec<String>> {
        if self.classes.is_empty() {
            return Err(ClassifierError::NotFitted);
        }

        Ok(self
            .predict_proba(queries)
            .iter()
            .map(|rates| self.classes[argmax(rates)].0.clone())
            .collect())
    }

    /// Class labels in first-seen order
    pub fn labels(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.classes.iter().map(|(label, _)| label.as_str())
    }

    /// Filter learned for `label`
    pub fn filter(&self, label: &str) -> Option<&BloomFilter> {
        self.index.get(label).map(|&slot| &self.classes[slot].1)
    }

    /// Labels and filters in first-seen order
    pub fn classes(&self) -> impl ExactSizeIterator<Item = (&str, &BloomFilter)> + '_ {
        self.classes
            .iter()
            .map(|(label, filter)| (label.as_str(), filter))
    }

    /// Labels whose filter holds more distinct k-mers than its capacity
    pub fn saturated_labels(&self) -> Vec<&str> {
        let capacity = self.config.filter.capacity as f64;
        self.classes
            .iter()
            .filter(|(_, filter)| filter.estimated_len() > capacity)
            .map(|(label, _)| label.as_str())
            .collect()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn slot_for(&mut self, label: &str) -> Result<usize> {
        if let Some(&slot) = self.index.get(label) {
            return Ok(slot);
        }

        let filter = BloomFilter::new(
            self.config.filter.capacity,
            self.config.filter.false_positive_rate,
        )?;
        debug!(
            label = %label,
            num_bits = filter.num_bits(),
            num_hashes = filter.num_hash_functions(),
            hash_family = %filter.hash_family().name(),
            "registered new class filter"
        );
        Ok(self.register(label.to_string(), filter))
    }

    /// Append a class and index it in one step
    fn register(&mut self, label: String, filter: BloomFilter) -> usize {
        let slot = self.classes.len();
        self.index.insert(label.clone(), slot);
        self.classes.push((label, filter));
        slot
    }
}

fn check_label_count(items: usize, labels: &Labels<'_>) -> Result<()> {
    match labels {
        Labels::PerItem(per_item) if per_item.len() != items => {
            Err(ClassifierError::LabelCountMismatch {
                labels: per_item.len(),
                items,
            })
        }
        _ => Ok(()),
    }
}

/// Index of the first maximum
fn argmax(rates: &[f64]) -> usize {
    let mut best = 0;
    for (i, &rate) in rates.iter().enumerate().skip(1) {
        if rate > rates[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterParams;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn bank(k: usize) -> ClassifierBank {
        ClassifierBank::new(ClassifierConfig::new(k, FilterParams::new(100, 0.01).unwrap()).unwrap())
            .unwrap()
    }

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_two_class_scenario() {
        let mut bank = bank(3);
        let y = labels(&["A", "B"]);
        bank.fit(&["AAAACCCC", "GGGGTTTT"], Labels::PerItem(&y))
            .unwrap();

        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(bank.predict(&["AAAACCCC"]).unwrap(), vec!["A"]);

        let proba = bank.predict_proba(&["AAAACCCC"]);
        assert_eq!(proba, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn test_short_query_scores_zero() {
        let mut bank = bank(3);
        let y = labels(&["A", "B"]);
        bank.fit(&["AAAACCCC", "GGGGTTTT"], Labels::PerItem(&y))
            .unwrap();

        assert_eq!(bank.predict_proba(&["AA"]), vec![vec![0.0, 0.0]]);
        // All-zero ties resolve to the first label
        assert_eq!(bank.predict(&["AA"]).unwrap(), vec!["A"]);
    }

    #[test]
    fn test_single_label() {
        let mut bank = bank(2);
        bank.fit(&["ACGT", "TTGA"], Labels::Single("virus")).unwrap();

        assert_eq!(bank.len(), 1);
        assert!(bank.filter("virus").unwrap().contains(b"TG"));
    }

    #[test]
    fn test_missing_label() {
        assert!(matches!(
            Labels::from_options(None, None),
            Err(ClassifierError::MissingLabel)
        ));

        let y = labels(&["A"]);
        assert!(matches!(
            Labels::from_options(Some(y.as_slice()), Some("B")),
            Ok(Labels::PerItem(_))
        ));
        assert!(matches!(
            Labels::from_options(None, Some("B")),
            Ok(Labels::Single("B"))
        ));
    }

    #[test]
    fn test_label_count_mismatch_leaves_bank_untouched() {
        let mut bank = bank(3);
        bank.fit(&["AAAACCCC"], Labels::Single("A")).unwrap();

        let y = labels(&["B"]);
        let err = bank
            .fit(&["GGGGTTTT", "TTTTGGGG"], Labels::PerItem(&y))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::LabelCountMismatch { labels: 1, items: 2 }
        ));
        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["A"]);
    }

    #[test]
    fn test_fit_with_config_keeps_bank_on_error() {
        let mut bank = bank(3);
        bank.fit(&["AAAACCCC"], Labels::Single("A")).unwrap();

        let wider = ClassifierConfig::new(5, FilterParams::new(50, 0.05).unwrap()).unwrap();
        let y = labels(&["x"]);
        let err = bank
            .fit_with_config(wider, &["AAAACCCC", "GGGGTTTT"], Labels::PerItem(&y))
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::LabelCountMismatch { labels: 1, items: 2 }
        ));
        assert_eq!(bank.config().kmer_size, 3);
        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["A"]);
        assert!(bank.filter("A").unwrap().contains(b"AAC"));

        bank.fit_with_config(wider, &["GGGGTTTT"], Labels::Single("B"))
            .unwrap();
        assert_eq!(bank.config(), &wider);
        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_partial_fit_accumulates() {
        let mut bank = bank(3);
        bank.partial_fit(&["AAAACCCC"], Labels::Single("A")).unwrap();
        bank.partial_fit(&["GGGGTTTT"], Labels::Single("B")).unwrap();
        bank.partial_fit(&["ACACACAC"], Labels::Single("A")).unwrap();

        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["A", "B"]);
        let filter = bank.filter("A").unwrap();
        assert!(filter.contains(b"AAA"));
        assert!(filter.contains(b"CAC"));
    }

    #[test]
    fn test_fit_resets() {
        let mut bank = bank(3);
        bank.fit(&["AAAACCCC"], Labels::Single("A")).unwrap();
        bank.fit(&["GGGGTTTT"], Labels::Single("B")).unwrap();

        assert_eq!(bank.labels().collect::<Vec<_>>(), vec!["B"]);
        assert!(bank.filter("A").is_none());
    }

    #[test]
    fn test_duplicate_query_kmers_count_once() {
        let mut bank = bank(3);
        bank.fit(&["AAAA"], Labels::Single("A")).unwrap();

        // Unique 3-mers of the query: AAA and AAC; only AAA was learned
        let proba = bank.predict_proba(&["AAAAAAAAC"]);
        assert_eq!(proba, vec![vec![0.5]]);
    }

    #[test]
    fn test_tie_goes_to_first_label() {
        let mut bank = bank(3);
        let y = labels(&["second", "first"]);
        bank.fit(&["ACGTAC", "ACGTAC"], Labels::PerItem(&y)).unwrap();

        assert_eq!(bank.predict(&["ACGTAC"]).unwrap(), vec!["second"]);
    }

    #[test]
    fn test_predict_unfitted() {
        let bank = bank(3);
        assert!(matches!(
            bank.predict(&["ACGT"]),
            Err(ClassifierError::NotFitted)
        ));
        assert_eq!(bank.predict_proba(&["ACGT"]), vec![Vec::<f64>::new()]);
    }

    #[test]
    fn test_reconfigure_clears() {
        let mut bank = bank(3);
        bank.fit(&["AAAACCCC"], Labels::Single("A")).unwrap();

        let config = ClassifierConfig::new(4, FilterParams::new(50, 0.05).unwrap()).unwrap();
        bank.reconfigure(config).unwrap();
        assert!(bank.is_empty());
        assert_eq!(bank.config().kmer_size, 4);

        let mut invalid = config;
        invalid.kmer_size = 0;
        assert!(bank.reconfigure(invalid).is_err());
    }

    #[test]
    fn test_saturated_labels() {
        let config = ClassifierConfig::new(4, FilterParams::new(10, 0.1).unwrap()).unwrap();
        let mut bank = ClassifierBank::new(config).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let sequence: String = (0..400)
            .map(|_| b"ACGT"[rng.gen_range(0..4)] as char)
            .collect();
        bank.fit(&[sequence], Labels::Single("big")).unwrap();
        bank.partial_fit(&["ACGTA"], Labels::Single("small")).unwrap();

        assert_eq!(bank.saturated_labels(), vec!["big"]);
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.2, 0.5, 0.5]), 1);
        assert_eq!(argmax(&[0.0, 0.0]), 0);
        assert_eq!(argmax(&[0.9]), 0);
    }
}
