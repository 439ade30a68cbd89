//! Random round-trip harness.
//!
//! Builds a tree from random frequencies, runs every validator, then encodes
//! and decodes a random buffer and prints the codec statistics.
//!
//! ```bash
//! cargo run --example random_roundtrip -- --size 9000 --log-level debug
//! cargo run --example random_roundtrip -- --config codec.json --json
//! ```

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use huffling::{CodecConfig, HuffmanCodec, HuffmanTree, ALPHABET_SIZE};

#[derive(Parser, Debug)]
#[command(name = "random-roundtrip")]
#[command(about = "Encode and decode random data with huffling", long_about = None)]
struct Args {
    /// Bytes of random input
    #[arg(short, long, default_value = "9000")]
    size: usize,

    /// RNG seed (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Lookahead byte to decode with the random tree
    #[arg(long, default_value = "121")]
    probe: u8,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print final metrics as JSON
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = StdRng::seed_from_u64(seed);
    info!("Seed: {}", seed);

    // Tree from a lopsided random frequency table
    let frequencies: Vec<u64> = (0..ALPHABET_SIZE)
        .map(|i| {
            if 20 < i && i < 100 {
                rng.gen_range(0..10)
            } else {
                rng.gen_range(0..100_000)
            }
        })
        .collect();
    let mut tree = HuffmanTree::new();
    tree.rebuild(&frequencies)?;
    tree.check_tree()?;
    tree.calculate_codes();
    tree.check_codes()?;
    tree.calculate_decode_accelerators();
    tree.check_decode_accelerators()?;
    info!(
        "Tree: {} internal nodes, longest code {} bits",
        tree.internal_node_count(),
        tree.max_code_len()
    );

    let fast = tree.decode_bits(args.probe, None);
    let slow = tree.decode_bits_unaccelerated(args.probe, None);
    info!("Probe {:08b}: table {:?}, walk {:?}", args.probe, fast, slow);
    if let Some(symbol) = fast.symbol() {
        info!("  code of {}: {:?}", symbol, tree.code(symbol));
    }

    // Round trip a buffer that folds 13..100 onto a single hot symbol
    let input: Vec<u8> = (0..args.size)
        .map(|_| {
            let b: u8 = rng.gen();
            if 12 < b && b < 100 {
                90
            } else {
                b
            }
        })
        .collect();

    let config = match &args.config {
        Some(path) => CodecConfig::from_path(path)?,
        None => CodecConfig::with_capacity(args.size + 1024),
    };
    let mut codec = HuffmanCodec::with_config(config);

    let summary = codec.encode(&input)?;
    info!(
        "Encoded {} bytes into {} bytes ({} bits)",
        summary.input_len, summary.bytes, summary.bits
    );
    if let Some(stats) = codec.last_stats() {
        info!(
            "  ratio {:.3}, {:.3} bits/symbol",
            stats.ratio().ratio(),
            stats.bits_per_symbol()
        );
    }

    let encoded = codec.encoded().to_vec();
    let decoded = codec.decode(&encoded, summary.bits)?;
    if decoded != input {
        error!("Round trip mismatch");
        return Err("decoded output differs from input".into());
    }
    info!("Round trip OK");

    if args.json {
        println!("{}", serde_json::to_string_pretty(codec.metrics())?);
    }
    Ok(())
}
