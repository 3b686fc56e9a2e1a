//! The `paratree` CLI: reads a parameter file and trailing key/value
//! overrides, builds the number-partitioning demo problem, and runs the
//! search on the current host.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use paratree::demo::{root_for, Numbers, Partition};
use paratree::{driver, RunConfig};
use paratree_core::ParameterSet;

#[derive(Debug, Parser)]
#[command(about = "A distributed branch-and-bound search over a small demo problem")]
struct Opts {
    /// Path to a parameter file (`ParamFile`-style keyword/value text).
    #[arg(value_name = "PARAM_FILE")]
    param_file: Option<PathBuf>,

    /// Trailing `key value` overrides, applied after the parameter file.
    #[arg(trailing_var_arg = true)]
    overrides: Vec<String>,

    /// The numbers to partition (defaults to a small built-in instance).
    #[arg(short, long, value_delimiter = ',')]
    numbers: Option<Vec<f64>>,
}

fn run() -> Result<(), paratree::Error> {
    let opts = Opts::parse();

    let mut params = ParameterSet::new();
    RunConfig::declare(&mut params);
    if let Some(path) = &opts.param_file {
        params.read_file(path)?;
    }
    params.read_args(&opts.overrides);

    let config = RunConfig::from_params(&params);
    tracing::info!(workers = config.workers, "starting search");

    let values = opts
        .numbers
        .unwrap_or_else(|| vec![25.0, 7.0, 13.0, 31.0, 42.0, 17.0, 8.0, 4.0]);
    let model = Arc::new(Numbers { values });
    let logic = Partition::new(Arc::clone(&model));
    let (root, root_quality) = root_for(&model);

    let report = driver::run_single_host(model, logic, root, root_quality, params, config)?;

    match report.best_objective {
        Some(best) => println!("best difference found: {best}"),
        None => println!("no feasible solution found"),
    }
    for (rank, stats) in &report.worker_stats {
        println!(
            "worker {rank}: {} nodes processed, {} solutions found",
            stats.nodes_processed, stats.solutions_found
        );
    }

    Ok(())
}

fn main() {
    paratree::logging::init();

    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
