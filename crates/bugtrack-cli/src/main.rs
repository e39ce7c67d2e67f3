//! bugtrack CLI: the `bugtrack` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "bugtrack=info,tower_http=info";

fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Init { path, json } => commands::init::run(path, json),
        Commands::Bug { command } => commands::bug::run(command),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
