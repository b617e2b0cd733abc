// src/main.rs
mod accounts;
mod cli;
mod config;
mod devices;
mod error;
mod models;
mod tui;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    env_logger::init();
    log::info!("Starting ARemi Pro");

    let config = config::load_config();
    let cli_args = cli::Cli::parse();

    if cli::handle_cli_command(cli_args, &config)? {
        tui::run_tui(&config)?;
    }

    log::info!("ARemi Pro finished.");
    Ok(())
}
