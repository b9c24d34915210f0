// SPDX-FileCopyrightText: 2026 VaultHub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! VaultHub - encrypted secret storage with scoped API keys.
//!
//! This is the binary entry point: the HTTP server plus the client-side
//! helpers operators and CLI users need around it.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod client;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vaulthub_config::VaulthubConfig;
use vaulthub_config::diagnostic::ConfigError;

/// VaultHub - encrypted secret storage with scoped API keys.
#[derive(Parser, Debug)]
#[command(name = "vaulthub", version, about, long_about = None)]
struct Cli {
    /// Config file to use instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve,
    /// Open a value sealed with client encryption.
    Decrypt {
        /// Sealed value as returned by the server, or `-` to read stdin.
        value: String,
        /// The vault's unique_id (the server's sealing salt).
        #[arg(long)]
        unique_id: String,
        /// Plaintext API key used for the request.
        #[arg(long, env = "VAULTHUB_API_KEY", hide_env_values = true)]
        api_key: String,
        /// PBKDF2 rounds; must match the server's transport.pbkdf2_iterations.
        #[arg(long, default_value_t = vaulthub_crypto::DEFAULT_PBKDF2_ITERATIONS)]
        iterations: u32,
    },
    /// Print a fresh random master key.
    GenerateMasterKey,
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Load and validate configuration, reporting every problem found.
    Check,
}

fn load_config(path: Option<&PathBuf>) -> Result<VaulthubConfig, Vec<ConfigError>> {
    match path {
        Some(path) => vaulthub_config::load_and_validate_path(path),
        None => vaulthub_config::load_and_validate(),
    }
}

fn load_or_exit(path: Option<&PathBuf>) -> VaulthubConfig {
    match load_config(path) {
        Ok(config) => config,
        Err(errors) => {
            vaulthub_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Serve) => {
            let config = load_or_exit(cli.config.as_ref());
            serve::run_serve(config).await
        }
        Some(Commands::Decrypt {
            value,
            unique_id,
            api_key,
            iterations,
        }) => client::run_decrypt(&value, &unique_id, api_key, iterations),
        Some(Commands::GenerateMasterKey) => client::run_generate_master_key(),
        Some(Commands::Config {
            action: ConfigAction::Check,
        }) => {
            let config = load_or_exit(cli.config.as_ref());
            eprintln!(
                "vaulthub: config OK (listening on {}:{}, database {})",
                config.server.bind_address, config.server.port, config.storage.database_path
            );
            Ok(())
        }
        None => {
            println!("vaulthub: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
