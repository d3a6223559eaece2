//! Basic usage examples for ferric-kmer

use ferric_kmer::{codec, BloomFilter, ClassifierBank, ClassifierConfig, FilterParams, KmerExtractor, Labels};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ferric Kmer Examples ===\n");

    // Example 1: A single class filter
    println!("1. Bloom filter over k-mers:");
    let extractor = KmerExtractor::new(6)?;
    let mut filter = BloomFilter::new(1000, 0.01)?;

    let dna_sequence = b"ATCGATCGATCGAAAGGGCCCTTTAAATTTCCCGGG";
    println!("  DNA sequence: {}", String::from_utf8_lossy(dna_sequence));
    for kmer in extractor.extract(dna_sequence) {
        filter.insert(kmer);
    }

    for kmer in ["ATCGAT", "GGCCCT", "TTTAAA", "ACACAC"] {
        let present = filter.contains(kmer.as_bytes());
        println!(
            "    {} -> {}",
            kmer,
            if present { "FOUND" } else { "NOT FOUND" }
        );
    }
    println!("  {}", filter.stats());
    println!();

    // Example 2: Multi-class classification
    println!("2. Classifier bank:");
    let config = ClassifierConfig::new(3, FilterParams::new(100, 0.01)?)?;
    let mut bank = ClassifierBank::new(config)?;

    let labels = vec!["A".to_string(), "B".to_string()];
    bank.fit(&["AAAACCCC", "GGGGTTTT"], Labels::PerItem(&labels))?;
    bank.partial_fit(&["ACGTACGT"], Labels::Single("C"))?;

    let queries = ["AAAACCCC", "GGGTTT", "TACGTA", "AC"];
    let proba = bank.predict_proba(&queries);
    let predicted = bank.predict(&queries)?;
    println!("  Labels: {:?}", bank.labels().collect::<Vec<_>>());
    for ((query, rates), label) in queries.iter().zip(&proba).zip(&predicted) {
        println!("    {:<10} {:?} -> {}", query, rates, label);
    }
    println!();

    // Example 3: Save and reload
    println!("3. Model round trip:");
    let bytes = codec::to_bytes(&bank);
    let restored = codec::from_bytes(&bytes)?;
    println!("  Serialized size: {} bytes", bytes.len());
    println!(
        "  Predictions match after reload: {}",
        restored.predict_proba(&queries) == proba
    );

    Ok(())
}
