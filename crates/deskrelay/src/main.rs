// SPDX-FileCopyrightText: 2026 Deskrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deskrelay - a support-desk bridge for Telegram.
//!
//! This is the binary entry point: parse the command line, load and
//! validate configuration, then hand off to the serve loop.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod serve;

/// Deskrelay - a support-desk bridge for Telegram.
#[derive(Parser, Debug)]
#[command(name = "deskrelay", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the relay against the configured bot and support chat.
    Serve,
    /// Print the effective configuration and exit.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match deskrelay_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            deskrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.relay.log_level);

    match cli.command {
        Some(Commands::Serve) | None => {
            if let Err(err) = serve::run(config).await {
                error!(%err, "relay stopped");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(err) => {
                error!(%err, "failed to render configuration");
                std::process::exit(1);
            }
        },
    }
}

/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
