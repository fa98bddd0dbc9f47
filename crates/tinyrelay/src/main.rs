// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! tinyrelay - a multi-channel chat relay for one AI conversation.
//!
//! This is the binary entry point. Each long-running component (processor,
//! one adapter per platform, heartbeat) runs as its own process.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod control;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tinyrelay_config::RelayConfig;

/// tinyrelay - relay chat platforms to one AI conversation.
#[derive(Parser, Debug)]
#[command(name = "tinyrelay", version, about, long_about = None)]
struct Cli {
    /// Load this config file (plus `TINYRELAY_*` env) instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the queue processor.
    Processor,
    /// Run the Telegram channel adapter.
    Telegram,
    /// Run the Discord channel adapter.
    Discord,
    /// Run the WhatsApp channel adapter.
    Whatsapp,
    /// Run the heartbeat trigger.
    Heartbeat {
        /// Enqueue a single heartbeat and exit.
        #[arg(long)]
        once: bool,
    },
    /// Start a fresh conversation with the next message.
    Reset,
    /// Enqueue a message on the system channel.
    Send {
        /// Message text.
        text: String,
    },
    /// Show queue counts and reset state.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> RelayConfig {
    let loaded = match path {
        Some(path) => tinyrelay_config::load_and_validate_path(path),
        None => tinyrelay_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            tinyrelay_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    serve::init_tracing(&config.relay.log_level);

    let result = match cli.command {
        Commands::Processor => serve::run_processor(&config).await,
        Commands::Telegram => serve::run_telegram(&config).await,
        Commands::Discord => serve::run_discord(&config).await,
        Commands::Whatsapp => serve::run_whatsapp(&config).await,
        Commands::Heartbeat { once } => serve::run_heartbeat(&config, once).await,
        Commands::Reset => control::run_reset(&config).await,
        Commands::Send { text } => control::run_send(&config, &text).await,
        Commands::Status { json } => status::run_status(&config, json).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
