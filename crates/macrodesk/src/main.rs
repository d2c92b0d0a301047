// SPDX-FileCopyrightText: 2026 Macrodesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Macrodesk - a multi-channel LLM customer-support agent.
//!
//! Binary entry point: loads and validates configuration, then dispatches
//! to the selected subcommand.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod seed;
mod serve;

/// Macrodesk - a multi-channel LLM customer-support agent.
#[derive(Parser, Debug)]
#[command(name = "macrodesk", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the gateway, batch coordinator, and conversation engine.
    Serve,
    /// Load the demo catalog, orders, and knowledge base.
    Seed,
    /// Print the resolved configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match macrodesk_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            macrodesk_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Seed) => seed::run_seed(&config).await,
        Some(Commands::Config) => {
            print_config(&config);
            Ok(())
        }
        None => {
            println!("macrodesk: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Prints the resolved configuration with secrets replaced.
fn print_config(config: &macrodesk_config::MacrodeskConfig) {
    let mut redacted = config.clone();
    if redacted.openrouter.api_key.is_some() {
        redacted.openrouter.api_key = Some("[redacted]".to_string());
    }
    if redacted.voice.api_key.is_some() {
        redacted.voice.api_key = Some("[redacted]".to_string());
    }
    match toml::to_string_pretty(&redacted) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("error: failed to render config: {e}"),
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this; the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = macrodesk_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "macrodesk");
    }
}
