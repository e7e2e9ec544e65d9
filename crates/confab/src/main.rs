// SPDX-FileCopyrightText: 2026 Confab Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Confab - queue-or-start orchestration for AI threads.
//!
//! This is the binary entry point for the Confab gateway and its operator
//! tooling.

use clap::{Parser, Subcommand};
use confab_core::ConfabError;

mod key;
mod serve;
mod thread;

/// Confab - queue-or-start orchestration for AI threads.
#[derive(Parser, Debug)]
#[command(name = "confab", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Confab gateway server.
    Serve,
    /// Manage encrypted provider credentials.
    Key {
        #[command(subcommand)]
        command: key::KeyCommand,
    },
    /// Manage AI threads.
    Thread {
        #[command(subcommand)]
        command: thread::ThreadCommand,
    },
    /// Inspect the effective configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration as TOML.
    Show,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match confab_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            confab_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Key { command }) => key::run_key(config, command).await,
        Some(Commands::Thread { command }) => thread::run_thread(config, command).await,
        Some(Commands::Config {
            command: ConfigCommand::Show,
        }) => show_config(&config),
        None => {
            println!("confab: use --help for available commands");
            Ok(())
        }
    };

    if let Err(error) = result {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn show_config(config: &confab_config::ConfabConfig) -> Result<(), ConfabError> {
    let mut config = config.clone();
    if config.keyring.server_secret.is_some() {
        config.keyring.server_secret = Some("[redacted]".to_string());
    }
    let rendered = toml::to_string_pretty(&config)
        .map_err(|e| ConfabError::Internal(format!("could not render config: {e}")))?;
    print!("{rendered}");
    Ok(())
}
