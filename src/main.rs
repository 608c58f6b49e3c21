/// brain-nn command line demo.
///
/// Cross-validates a sigmoid network (one hidden layer of 3 nodes) on a JSON
/// training set, keeps the fold with the lowest training error and prints a
/// histogram of |expected - result| over an optional test set.
///
/// Run with:
///   RUST_LOG=info cargo run --release -- <train.json> [test.json] [--folds K] [--out network.json]
///
/// Data files are JSON arrays of `{ "input": [..], "output": [..] }`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use brain_nn::{
    CrossValidate, Network, NetworkOptions, TrainingDatum, TrainingOptions, DEFAULT_FOLDS,
};

#[derive(Parser, Debug)]
#[command(name = "brain-nn", about = "Cross-validate a sigmoid network on a JSON training set")]
struct Args {
    /// Training examples (JSON array of { input, output })
    train: PathBuf,

    /// Optional test examples for the delta histogram
    test: Option<PathBuf>,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = DEFAULT_FOLDS)]
    folds: usize,

    /// Where to write the winning network export
    #[arg(long)]
    out: Option<PathBuf>,
}

fn load_data(path: &Path) -> brain_nn::Result<Vec<TrainingDatum>> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}

fn run(args: Args) -> brain_nn::Result<()> {
    let training_data = load_data(&args.train)?;
    info!("loaded {} training examples from {}", training_data.len(), args.train.display());

    let options = TrainingOptions {
        log: true,
        log_period: 100,
        ..Default::default()
    };

    let mut cross_validate = CrossValidate::new(|fold| {
        Network::with_id(NetworkOptions::hidden(vec![3]), fold)
    });
    let stats = cross_validate.train(&training_data, &options, args.folds)?;
    info!(
        "cross-validation: mean error {:.6}, mean iterations {}, accuracy {:.3}",
        stats.averages.error, stats.averages.iterations, stats.stats.accuracy
    );

    let mut network = cross_validate.to_network()?;

    if let Some(out) = &args.out {
        network.export()?.save_json(out)?;
        info!("wrote winning network to {}", out.display());
    }

    if let Some(test_path) = &args.test {
        let test_data = load_data(test_path)?;
        let mut buckets: BTreeMap<i64, usize> = BTreeMap::new();
        for datum in &test_data {
            let result = network.run(&datum.input)?;
            let (Some(expected), Some(actual)) = (datum.output.first(), result.first()) else {
                continue;
            };
            let delta = (expected - actual).abs();
            *buckets.entry((delta * 100.0).round() as i64).or_default() += 1;
        }
        for (bucket, count) in buckets {
            println!("Delta: {:.2} => Count: {count}", bucket as f64 / 100.0);
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
