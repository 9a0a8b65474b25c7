//! Thin CLI binary: parses arguments with `clap` and dispatches to
//! `codex_core::cli`. Exit codes per §6: 0 success, 2 runtime error (usage
//! errors exit 1 via clap's own handling).

use clap::Parser;
use codex_core::cli::{run, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(2);
    }
}
