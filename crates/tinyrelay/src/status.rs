// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tinyrelay status` command implementation.
//!
//! Reads the queue directories and the reset flag; needs no running
//! component.

use std::path::PathBuf;

use serde::Serialize;
use tinyrelay_config::RelayConfig;
use tinyrelay_core::RelayError;
use tinyrelay_queue::{QueueStore, ResetFlag};

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub queue_root: PathBuf,
    pub incoming: usize,
    pub processing: usize,
    pub outgoing: usize,
    pub reset_pending: bool,
}

impl StatusReport {
    pub async fn collect(store: &QueueStore, reset: &ResetFlag) -> Result<Self, RelayError> {
        let stats = store.stats().await?;
        Ok(Self {
            queue_root: store.root().to_path_buf(),
            incoming: stats.incoming,
            processing: stats.processing,
            outgoing: stats.outgoing,
            reset_pending: reset.is_set().await,
        })
    }

    fn render(&self) -> String {
        format!(
            "queue root:  {}\nincoming:    {}\nprocessing:  {}\noutgoing:    {}\nreset flag:  {}",
            self.queue_root.display(),
            self.incoming,
            self.processing,
            self.outgoing,
            if self.reset_pending { "set" } else { "clear" },
        )
    }
}

/// Run the `tinyrelay status` command.
pub async fn run_status(config: &RelayConfig, json: bool) -> Result<(), RelayError> {
    let store = QueueStore::new(config.relay.queue_root());
    let reset = ResetFlag::new(config.relay.reset_flag_path());
    let report = StatusReport::collect(&store, &reset).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.render());
    }
    Ok(())
}
