//! Build a UPGMA tree over random integer taxa and print it.
//!
//! ```text
//! cargo run --example upgma_demo -- --count 8 --max 200 --seed 7
//! RUST_LOG=upgma=debug cargo run --example upgma_demo
//! ```

use clap::Parser;
use rand::prelude::*;
use tracing_subscriber::EnvFilter;
use upgma::{AbsoluteDifference, HealthCheck, Upgma};

#[derive(Debug, Parser)]
#[command(about = "Cluster random integer taxa with UPGMA")]
struct Args {
    /// Number of taxa to generate.
    #[arg(long, default_value_t = 8)]
    count: usize,

    /// Largest taxon value (inclusive).
    #[arg(long, default_value_t = 200)]
    max: u32,

    /// Seed for reproducible taxa.
    #[arg(long)]
    seed: Option<u64>,

    /// Separator placed between leaves when printing.
    #[arg(long, default_value = "-")]
    separator: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut rng: Box<dyn RngCore> = match args.seed {
        Some(s) => Box::new(StdRng::seed_from_u64(s)),
        None => Box::new(rand::rng()),
    };
    let taxa: Vec<u32> = (0..args.count)
        .map(|_| rng.random_range(0..=args.max))
        .collect();
    println!("Initial clusters: {:?}", taxa);

    let tree = Upgma::new()
        .with_separator(args.separator)
        .build_with(taxa, AbsoluteDifference)?;
    println!("{tree}");

    if let Some(branch) = tree.largest_branch() {
        println!(
            "Largest branch ({} taxa): {}",
            branch.leaf_count(),
            branch.display_with(tree.separator())
        );
    }

    for (i, merge) in tree.dendrogram().merges().enumerate() {
        println!(
            "  merge {:>2}: {:>3} + {:>3} -> {:>3}  d={:.3} size={}",
            i,
            merge.left,
            merge.right,
            tree.dendrogram().n_items() + i,
            merge.distance,
            merge.size
        );
    }

    let report = tree.health_check();
    if !report.is_healthy() {
        anyhow::bail!("tree failed its health check:\n{report}");
    }

    Ok(())
}
