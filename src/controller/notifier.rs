//! # Change Notifier
//!
//! Runs the configured reload command once per batch that changed mirror
//! files. Command failures are logged and never propagated.

use crate::constants::RELOAD_SHELL;
use crate::observability::metrics;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Captured result of one command run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when terminated by a signal
    pub status: Option<i32>,
    pub success: bool,
    /// stdout followed by stderr
    pub output: String,
}

/// Executes a command string
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> std::io::Result<CommandOutput>;
}

/// Runs commands through `sh -c`
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> std::io::Result<CommandOutput> {
        let output = tokio::process::Command::new(RELOAD_SHELL)
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CommandOutput {
            status: output.status.code(),
            success: output.status.success(),
            output: combined,
        })
    }
}

#[derive(Clone)]
pub struct Notifier {
    command: Option<String>,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl Notifier {
    pub fn new(command: Option<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self { command, runner }
    }

    /// Notifier running `command` through the shell
    #[must_use]
    pub fn shell(command: Option<String>) -> Self {
        Self::new(command, Arc::new(ShellRunner))
    }

    /// Run the reload command if the batch changed anything
    ///
    /// Returns whether the command was started.
    pub async fn notify_if_changed(&self, changed: bool) -> bool {
        if !changed {
            return false;
        }
        let Some(command) = self.command.as_deref() else {
            debug!("Certificates changed, no reload command configured");
            return false;
        };

        info!(cmd = command, "Certificates changed, running reload command");
        metrics::increment_reload_commands();

        match self.runner.run(command).await {
            Ok(out) if out.success => {
                debug!(cmd = command, output = %out.output, "Reload command succeeded");
            }
            Ok(out) => {
                metrics::increment_reload_command_failures();
                error!(
                    cmd = command,
                    status = ?out.status,
                    output = %out.output,
                    "Reload command failed"
                );
            }
            Err(e) => {
                metrics::increment_reload_command_failures();
                error!(cmd = command, error = %e, "Failed to start reload command");
            }
        }
        true
    }
}
