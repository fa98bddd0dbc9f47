// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running commands: the processor, the channel adapters, and the
//! heartbeat trigger.
//!
//! Every loop shares one cancellation token from
//! [`install_signal_handler`], so SIGINT/SIGTERM stop it cleanly.

use std::sync::Arc;

use tinyrelay_channel::{AdapterSettings, RelayAdapter};
use tinyrelay_config::RelayConfig;
use tinyrelay_core::{ChatPlatform, RelayError};
use tinyrelay_processor::{
    install_signal_handler, CliBackend, HeartbeatTrigger, ProcessorSettings, QueueProcessor,
};
use tinyrelay_queue::{QueueStore, ResetFlag};
use tracing::info;

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured level applies to the
/// relay crates and everything else logs at `warn`. Output goes to stderr
/// so `status --json` stays clean.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(relay_filter(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

fn relay_filter(log_level: &str) -> String {
    [
        "tinyrelay",
        "tinyrelay_core",
        "tinyrelay_queue",
        "tinyrelay_processor",
        "tinyrelay_channel",
        "tinyrelay_telegram",
        "tinyrelay_discord",
        "tinyrelay_whatsapp",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .chain(std::iter::once("warn".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}

fn queue_parts(config: &RelayConfig) -> (QueueStore, ResetFlag) {
    (
        QueueStore::new(config.relay.queue_root()),
        ResetFlag::new(config.relay.reset_flag_path()),
    )
}

/// Run the queue processor until a shutdown signal.
pub async fn run_processor(config: &RelayConfig) -> Result<(), RelayError> {
    let (store, reset) = queue_parts(config);
    let backend = CliBackend::from_config(&config.backend);
    info!(
        relay = %config.relay.name,
        queue = %store.root().display(),
        command = %config.backend.command,
        "starting queue processor"
    );

    let mut processor = QueueProcessor::new(
        store,
        reset,
        Arc::new(backend),
        ProcessorSettings::from_config(config),
    );
    processor.run(install_signal_handler()).await
}

/// Connect `platform` and bridge it to the queue until a shutdown signal.
async fn run_adapter<P: ChatPlatform>(platform: P, config: &RelayConfig) -> Result<(), RelayError> {
    let (store, reset) = queue_parts(config);
    info!(
        relay = %config.relay.name,
        channel = %platform.channel(),
        queue = %store.root().display(),
        "starting channel adapter"
    );

    let adapter = RelayAdapter::connect(
        platform,
        store,
        reset,
        AdapterSettings::from_config(&config.queue),
    )
    .await?;
    adapter.run(install_signal_handler()).await
}

#[cfg(feature = "telegram")]
pub async fn run_telegram(config: &RelayConfig) -> Result<(), RelayError> {
    let platform = tinyrelay_telegram::TelegramPlatform::new(config.telegram.clone())?;
    run_adapter(platform, config).await
}

#[cfg(not(feature = "telegram"))]
pub async fn run_telegram(_config: &RelayConfig) -> Result<(), RelayError> {
    Err(not_built("telegram"))
}

#[cfg(feature = "discord")]
pub async fn run_discord(config: &RelayConfig) -> Result<(), RelayError> {
    let platform = tinyrelay_discord::DiscordPlatform::new(config.discord.clone())?;
    run_adapter(platform, config).await
}

#[cfg(not(feature = "discord"))]
pub async fn run_discord(_config: &RelayConfig) -> Result<(), RelayError> {
    Err(not_built("discord"))
}

#[cfg(feature = "whatsapp")]
pub async fn run_whatsapp(config: &RelayConfig) -> Result<(), RelayError> {
    let platform = tinyrelay_whatsapp::WhatsAppPlatform::new(config.whatsapp.clone())?;
    run_adapter(platform, config).await
}

#[cfg(not(feature = "whatsapp"))]
pub async fn run_whatsapp(_config: &RelayConfig) -> Result<(), RelayError> {
    Err(not_built("whatsapp"))
}

#[cfg(not(all(feature = "telegram", feature = "discord", feature = "whatsapp")))]
fn not_built(platform: &str) -> RelayError {
    RelayError::Config(format!(
        "tinyrelay was built without the `{platform}` feature"
    ))
}

/// Run the heartbeat loop, or enqueue one heartbeat with `once`.
pub async fn run_heartbeat(config: &RelayConfig, once: bool) -> Result<(), RelayError> {
    let (store, _) = queue_parts(config);
    store.ensure_dirs().await?;
    let trigger = HeartbeatTrigger::from_config(store, &config.heartbeat);

    if once {
        let id = trigger.fire().await?;
        println!("heartbeat queued: {id}");
        return Ok(());
    }

    if !config.heartbeat.enabled {
        info!("heartbeat disabled in config, nothing to do");
        return Ok(());
    }

    trigger.run(install_signal_handler()).await
}
