// SPDX-FileCopyrightText: 2026 CareBridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CareBridge - a conversation broker for patient-facing clinic chat.
//!
//! This is the binary entry point for the CareBridge service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};

mod serve;

/// CareBridge - a conversation broker for patient-facing clinic chat.
#[derive(Parser, Debug)]
#[command(name = "carebridge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the CareBridge broker and HTTP gateway.
    Serve,
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match carebridge_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            carebridge_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(err) = serve::run(config).await {
                eprintln!("carebridge serve: {err}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                eprintln!("carebridge config: failed to render configuration: {err}");
                std::process::exit(1);
            }
        },
        None => {
            println!("carebridge: use --help for available commands");
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Verify jemalloc is the global allocator by advancing the epoch.
        // Only jemalloc supports this -- the system allocator would fail.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn binary_loads_config_defaults() {
        // Verify config loads with defaults (no config file needed)
        let config = carebridge_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "carebridge");
    }

    #[test]
    fn effective_config_renders_as_toml() {
        let config = carebridge_config::load_and_validate_str("")
            .expect("default config should be valid");
        let rendered = toml::to_string_pretty(&config).expect("config serializes");
        assert!(rendered.contains("[agent]"));
        assert!(rendered.contains("[gateway]"));
    }
}
