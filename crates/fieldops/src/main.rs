// SPDX-FileCopyrightText: 2026 Fieldops Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fieldops - business processes over text messaging.
//!
//! This is the binary entry point.

mod config_cmd;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use fieldops_config::model::FieldopsConfig;

/// Fieldops - tickets, interventions, punches and scheduled jobs over text messaging.
#[derive(Parser, Debug)]
#[command(name = "fieldops", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the bot: agent loop, scheduler and admin gateway.
    Serve,
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigAction {
    /// Print the merged configuration as TOML, secrets redacted.
    Show,
    /// Only validate the configuration.
    Validate,
}

fn load_config(path: Option<&PathBuf>) -> FieldopsConfig {
    let loaded = match path {
        Some(path) => fieldops_config::load_and_validate_path(path),
        None => fieldops_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            fieldops_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config { action }) => {
            match action.unwrap_or(ConfigAction::Show) {
                ConfigAction::Show => match config_cmd::render_redacted(&config) {
                    Ok(toml) => print!("{toml}"),
                    Err(e) => {
                        eprintln!("error: {e}");
                        std::process::exit(1);
                    }
                },
                ConfigAction::Validate => println!("configuration is valid"),
            }
        }
        None => {
            println!("fieldops: use --help for available commands");
        }
    }
}
