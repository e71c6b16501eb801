use std::process;

use clap::Parser;
use kmermaid::cli::{Cli, Command};
use kmermaid::error::KmaidError;
use kmermaid::run::{run_batch, run_count, run_uniq};

/// Initialize the tracing subscriber with environment filter.
///
/// Set `RUST_LOG=kmermaid=debug` (or `KMERMAID_LOG`) to see debug output.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_env("KMERMAID_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Batch(args) => run_batch(args),
        Command::Count(args) => run_count(args),
        Command::Uniq(args) => run_uniq(args),
    };

    if let Err(err) = result {
        report_and_exit(&err);
    }
}

fn report_and_exit(err: &KmaidError) -> ! {
    eprintln!("error: {err}");
    process::exit(1);
}
