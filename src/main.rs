mod cli;
mod config;
mod core;
mod error;
mod models;
mod sources;

use clap::Parser;
use tracing::{error, info};

fn main() {
    let cli = cli::Cli::parse();
    cli::init_logging(&cli);
    info!("start");

    match cli::run(cli) {
        Ok(report) => {
            info!("finish");
            if !report.is_clean() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            std::process::exit(1);
        }
    }
}
