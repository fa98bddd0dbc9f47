// SPDX-FileCopyrightText: 2026 Tinyrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External AI process invoked as a command-line subprocess.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tinyrelay_config::model::BackendConfig;
use tinyrelay_core::{AiBackend, RelayError, SessionMode};
use tracing::debug;

/// Longest stderr excerpt carried into a backend error.
const STDERR_EXCERPT_CHARS: usize = 500;

/// Runs the configured AI command once per message and returns its stdout.
///
/// The command line is `command [args...] [continue_args... when continuing]
/// [prompt_arg] message`.
#[derive(Debug, Clone)]
pub struct CliBackend {
    command: String,
    args: Vec<String>,
    continue_args: Vec<String>,
    prompt_arg: Option<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl CliBackend {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            continue_args: Vec::new(),
            prompt_arg: None,
            working_dir: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &BackendConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            continue_args: config.continue_args.clone(),
            prompt_arg: config.prompt_arg.clone(),
            working_dir: config.working_dir.as_ref().map(PathBuf::from),
            timeout: config.timeout(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_continue_args(mut self, continue_args: Vec<String>) -> Self {
        self.continue_args = continue_args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full argument vector for one invocation.
    fn argv(&self, mode: SessionMode, message: &str) -> Vec<String> {
        let mut argv = self.args.clone();
        if mode == SessionMode::Continue {
            argv.extend(self.continue_args.iter().cloned());
        }
        if let Some(flag) = &self.prompt_arg {
            argv.push(flag.clone());
        }
        argv.push(message.to_string());
        argv
    }

    async fn run(&self, argv: Vec<String>) -> Result<std::process::Output, RelayError> {
        let mut cmd = tokio::process::Command::new(&self.command);
        cmd.args(&argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let spawn_err = |e: std::io::Error| RelayError::Backend {
            message: format!("failed to run `{}`: {e}", self.command),
            source: Some(Box::new(e)),
        };

        match self.timeout {
            Some(duration) => tokio::time::timeout(duration, cmd.output())
                .await
                .map_err(|_| RelayError::Timeout { duration })?
                .map_err(spawn_err),
            None => cmd.output().await.map_err(spawn_err),
        }
    }
}

#[async_trait]
impl AiBackend for CliBackend {
    fn name(&self) -> &str {
        &self.command
    }

    async fn invoke(&self, mode: SessionMode, message: &str) -> Result<String, RelayError> {
        debug!(command = %self.command, %mode, "invoking AI backend");
        let output = self.run(self.argv(mode, message)).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let excerpt: String = stderr.trim().chars().take(STDERR_EXCERPT_CHARS).collect();
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return Err(RelayError::Backend {
                message: format!("`{}` exited with {code}: {excerpt}", self.command),
                source: None,
            });
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(RelayError::Backend {
                message: format!("`{}` produced no output", self.command),
                source: None,
            });
        }
        Ok(reply)
    }
}
