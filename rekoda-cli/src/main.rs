mod cli;
mod commands;
mod config;
mod error;
mod logging;

use std::process;

use clap::Parser;
use tracing::{debug, error};

use crate::cli::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match logging::init_logging(args.verbose.as_deref()) {
        Ok(level) => debug!("Log level: {level}"),
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e}");
            process::exit(1);
        }
    }

    if let Err(e) = commands::run(args).await {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
