use ferric_kmer::{codec, ClassifierBank, ClassifierConfig, FilterParams, Labels};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

const BASES: &[u8; 4] = b"ACGT";

fn random_sequence(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Copy `source` with roughly `rate` of its bases substituted
fn mutate(rng: &mut StdRng, source: &[u8], rate: f64) -> Vec<u8> {
    source
        .iter()
        .map(|&base| {
            if rng.gen_bool(rate) {
                BASES[rng.gen_range(0..4)]
            } else {
                base
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("🦀 Rust Micro Benchmark - K-mer Classifier");
    println!("{}", "=".repeat(55));

    // Class counts to sweep
    let class_counts: Vec<usize> = vec![2, 4, 8, 16, 32];
    let genome_len = 20_000;
    let reads_per_class = 50;
    let read_len = 150;
    let mutation_rate = 0.02;

    println!("Testing class counts: {:?}", class_counts);
    println!();

    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(42);

    for &n_classes in &class_counts {
        println!("🔬 Testing {} classes...", n_classes);

        let genomes: Vec<Vec<u8>> = (0..n_classes)
            .map(|_| random_sequence(&mut rng, genome_len))
            .collect();
        let labels: Vec<String> = (0..n_classes).map(|i| format!("class_{}", i)).collect();

        // Reads sampled from each genome with sequencing noise
        let mut reads = Vec::with_capacity(n_classes * reads_per_class);
        let mut truth = Vec::with_capacity(n_classes * reads_per_class);
        for (genome, label) in genomes.iter().zip(&labels) {
            for _ in 0..reads_per_class {
                let start = rng.gen_range(0..genome_len - read_len);
                reads.push(mutate(&mut rng, &genome[start..start + read_len], mutation_rate));
                truth.push(label.clone());
            }
        }

        let config = ClassifierConfig::new(21, FilterParams::new(genome_len, 0.01)?)?;
        let mut bank = ClassifierBank::new(config)?;

        // Fit benchmark
        let start = Instant::now();
        bank.fit(&genomes, Labels::PerItem(&labels))?;
        let fit_time = start.elapsed().as_secs_f64();

        // Predict benchmark
        let start = Instant::now();
        let predicted = bank.predict(&reads)?;
        let predict_time = start.elapsed().as_secs_f64();

        let correct = predicted.iter().zip(&truth).filter(|(p, t)| p == t).count();
        let accuracy = correct as f64 / reads.len() as f64;
        let model_bytes = codec::to_bytes(&bank).len();

        let fit_rate = if fit_time > 0.0 {
            (n_classes * genome_len) as f64 / fit_time
        } else {
            f64::INFINITY
        };
        let query_rate = if predict_time > 0.0 {
            reads.len() as f64 / predict_time
        } else {
            f64::INFINITY
        };

        results.push((
            n_classes,
            fit_time,
            predict_time,
            fit_rate,
            query_rate,
            accuracy,
            model_bytes,
        ));

        println!(
            "   ✅ Done - Fit rate: {:.0} bases/s, Query rate: {:.0} reads/s",
            fit_rate, query_rate
        );
    }

    println!("\n📊 Results (CSV format):");
    println!("classes,fit_time,predict_time,fit_rate,query_rate,accuracy,model_bytes");

    for (classes, fit_time, predict_time, fit_rate, query_rate, accuracy, model_bytes) in &results {
        println!(
            "{},{:.6},{:.6},{:.0},{:.0},{:.4},{}",
            classes, fit_time, predict_time, fit_rate, query_rate, accuracy, model_bytes
        );
    }

    if let Some(&(classes, _, _, fit_rate, query_rate, accuracy, model_bytes)) = results.last() {
        println!("\n🎯 Key Findings (at {} classes):", classes);
        println!("   Fit rate: {:.0} bases/s", fit_rate);
        println!("   Query rate: {:.0} reads/s", query_rate);
        println!("   Accuracy: {:.4}", accuracy);
        println!("   Model size: {} bytes", model_bytes);
    }

    Ok(())
}
