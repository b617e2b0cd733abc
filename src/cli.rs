// src/cli.rs
use crate::accounts::AccountStore;
use crate::config::Config;
use crate::devices::DeviceStore;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

/// Inventory manager for Wii homebrew devices.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(arg_required_else_help = false)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the device table (public fields only) from a devices file
    List {
        /// Devices file to read; defaults to the configured one
        #[clap(short, long, value_parser)]
        file: Option<PathBuf>,
    },
    /// Copy devices from one file to another, re-assigning IDs
    Export {
        /// Source devices file; defaults to the configured one
        #[clap(short, long, value_parser)]
        from: Option<PathBuf>,
        /// Destination file
        #[clap(short, long, value_parser)]
        to: PathBuf,
        /// Only export the devices with these IDs (IDs as listed from the source)
        #[clap(short, long, value_delimiter = ',')]
        ids: Option<Vec<u32>>,
    },
    /// Append the devices from a file to the configured devices file
    Import {
        /// File holding a JSON device array
        #[clap(value_parser)]
        file: PathBuf,
    },
    /// Launch the terminal UI
    Tui,
}

/// Handles the parsed CLI command. Returns `Ok(true)` if the TUI should
/// run, `Ok(false)` if a command was handled here.
pub fn handle_cli_command(cli: Cli, config: &Config) -> Result<bool> {
    log::debug!("Handling CLI command: {:?}", cli.command);
    match cli.command {
        Some(Commands::List { file }) => {
            login(config)?;
            let path = file.unwrap_or_else(|| config.devices_file.clone());
            // A scratch store keeps list() as the only read path; the
            // IDs it prints are display-fresh, not the ones in the file.
            let mut store = DeviceStore::new(&path);
            let count = if path.exists() {
                store
                    .import_from_file(&path)
                    .with_context(|| format!("Failed to read devices from {:?}", path))?
            } else {
                0
            };
            if count == 0 {
                println!("No devices found in {:?}.", path);
            } else {
                println!("{:<6} {:<24} {:<12} {}", "ID", "Name", "AppID", "Status");
                for view in store.list() {
                    println!(
                        "{:<6} {:<24} {:<12} {}",
                        view.id, view.name, view.app_id, view.status
                    );
                }
            }
            log::info!("Listed {} devices from {:?}.", count, path);
            Ok(false)
        }
        Some(Commands::Export { from, to, ids }) => {
            login(config)?;
            let source = from.unwrap_or_else(|| config.devices_file.clone());
            let mut store = DeviceStore::new(&source);
            store
                .import_from_file(&source)
                .with_context(|| format!("Failed to read devices from {:?}", source))?;
            let written = match ids {
                Some(ids) => store.export_subset(&ids, &to),
                None => store.export_all(&to),
            }
            .with_context(|| format!("Failed to write devices to {:?}", to))?;
            println!("Exported {} devices to {:?}.", written, to);
            Ok(false)
        }
        Some(Commands::Import { file }) => {
            login(config)?;
            let mut store = DeviceStore::new(&config.devices_file);
            // Pick up what is already in the default file so the import
            // appends instead of clobbering it.
            if config.devices_file.exists() {
                store
                    .import_from_file(&config.devices_file)
                    .with_context(|| {
                        format!("Failed to read devices from {:?}", config.devices_file)
                    })?;
            }
            let count = store
                .import_from_file(&file)
                .with_context(|| format!("Failed to import devices from {:?}", file))?;
            println!(
                "Imported {} devices into {:?} ({} total).",
                count,
                config.devices_file,
                store.len()
            );
            Ok(false)
        }
        Some(Commands::Tui) | None => {
            log::info!("Launching TUI.");
            Ok(true)
        }
    }
}

/// Prompts for credentials on the terminal and checks them against the
/// accounts store, seeding defaults on first run like the TUI login.
fn login(config: &Config) -> Result<()> {
    let accounts = AccountStore::load(&config.accounts_file);
    log::debug!("{} accounts available for CLI login.", accounts.len());
    if accounts.is_empty() {
        log::warn!("Account store is empty; every login will be rejected.");
    }

    print!("Username: ");
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut username = String::new();
    io::stdin()
        .read_line(&mut username)
        .context("Failed to read username")?;
    let username = username.trim();

    let password =
        rpassword::prompt_password("Password: ").context("Failed to read password")?;

    if !accounts.authenticate(username, &password) {
        log::warn!("Failed CLI login attempt for '{}'.", username);
        bail!("Invalid login credentials");
    }
    log::info!("CLI login as '{}'.", username);
    Ok(())
}
