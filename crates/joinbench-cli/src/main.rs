//! joinbench CLI - join-key detection benchmarks.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `-v` turns on debug output for the library.
fn init_logging(verbose: bool) {
    let default = if verbose { "info,joinbench=debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Pairs {
            spider_dir,
            pairs,
            methods,
            thresholds,
            limit,
            outdir,
            workers,
            no_fallback,
            mock_llm,
        } => commands::pairs::run(commands::pairs::PairsArgs {
            spider_dir,
            pairs,
            methods,
            thresholds,
            limit,
            outdir,
            workers,
            no_fallback,
            mock_llm,
        }),

        Commands::Queries {
            spider_dir,
            gold,
            method,
            threshold,
            max_candidates,
            limit,
            outdir,
            no_fallback,
            mock_llm,
        } => commands::queries::run(commands::queries::QueriesArgs {
            spider_dir,
            gold,
            method,
            threshold,
            max_candidates,
            limit,
            outdir,
            no_fallback,
            mock_llm,
        }),

        Commands::Sweep {
            spider_dir,
            pairs,
            method,
            thresholds,
            limit,
            outdir,
            no_fallback,
            mock_llm,
        } => commands::sweep::run(commands::sweep::SweepArgs {
            spider_dir,
            pairs,
            method,
            thresholds,
            limit,
            outdir,
            no_fallback,
            mock_llm,
        }),

        Commands::Probe {
            spider_dir,
            db_id,
            table,
            column,
            n,
        } => commands::probe::run(spider_dir, db_id, table, column, n),

        Commands::Failures {
            spider_dir,
            run_dir,
            k,
        } => commands::failures::run(spider_dir, run_dir, k),

        Commands::Summarize {
            runs_dir,
            methods,
            top_k,
            out_md,
        } => commands::summarize::run(runs_dir, methods, top_k, out_md),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
