//! Local daemon lifecycle.
//!
//! The Ollama daemon is probed once; when it does not answer, `ollama serve`
//! is spawned as a detached process and the health endpoint is polled at a
//! fixed interval for a bounded number of attempts.
//!
//! ```text
//! Unchecked ──probe ok──▶ Healthy
//!     │
//!     └─probe failed──▶ Unhealthy ──spawn, poll ok──▶ Healthy
//!                           │
//!                           └─attempts exhausted──▶ DaemonStartup error
//! ```

use crate::config::OllamaSettings;
use crate::error::{ollama_remediation, GeneratorError, Result};
use crate::llm::providers::ollama::OllamaClient;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Health of the local daemon as last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Unchecked,
    Healthy,
    Unhealthy,
}

/// Starts the daemon process. The process is not owned after launch.
pub trait DaemonLauncher: Send + Sync + std::fmt::Debug {
    fn launch(&self) -> std::io::Result<()>;
}

/// Runs `ollama serve` detached with null stdio
#[derive(Debug, Clone)]
pub struct OllamaServeLauncher {
    program: String,
}

impl Default for OllamaServeLauncher {
    fn default() -> Self {
        Self {
            program: "ollama".to_string(),
        }
    }
}

impl OllamaServeLauncher {
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DaemonLauncher for OllamaServeLauncher {
    fn launch(&self) -> std::io::Result<()> {
        let mut command = std::process::Command::new(&self.program);
        command
            .arg("serve")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn()?;
        debug!("🦙 Spawned {} serve (pid {})", self.program, child.id());
        // Dropping the handle leaves the daemon running on its own
        drop(child);
        Ok(())
    }
}

/// Spawn-and-poll state machine for one daemon base URL
#[derive(Debug)]
pub struct DaemonSupervisor {
    client: OllamaClient,
    state: DaemonState,
    auto_start: bool,
    poll_interval: Duration,
    max_attempts: u32,
}

impl DaemonSupervisor {
    pub fn new(client: OllamaClient, settings: &OllamaSettings) -> Self {
        Self {
            client,
            state: DaemonState::Unchecked,
            auto_start: settings.auto_start,
            poll_interval: settings.poll_interval,
            max_attempts: settings.max_start_attempts,
        }
    }

    pub fn state(&self) -> DaemonState {
        self.state
    }

    /// Single health probe, recorded as the current state
    pub async fn probe(&mut self) -> DaemonState {
        self.state = if self.client.is_healthy().await {
            DaemonState::Healthy
        } else {
            DaemonState::Unhealthy
        };
        self.state
    }

    /// Drive the state machine to `Healthy` or fail with `DaemonStartup`
    pub async fn ensure_running(&mut self, model: &str, launcher: &dyn DaemonLauncher) -> Result<()> {
        if self.probe().await == DaemonState::Healthy {
            debug!("🦙 Ollama daemon already running at {}", self.client.base_url());
            return Ok(());
        }

        if !self.auto_start {
            error!("❌ Ollama daemon not reachable at {} and auto-start is disabled", self.client.base_url());
            return Err(self.startup_error(model, 0));
        }

        info!("🦙 Ollama not running, starting daemon...");
        if let Err(e) = launcher.launch() {
            error!("❌ Failed to spawn Ollama daemon: {}", e);
            return Err(self.startup_error(model, 0));
        }

        for attempt in 1..=self.max_attempts {
            tokio::time::sleep(self.poll_interval).await;
            if self.probe().await == DaemonState::Healthy {
                info!("✅ Ollama daemon ready after {} probe(s)", attempt);
                return Ok(());
            }
            debug!("🔄 Ollama probe {}/{} failed", attempt, self.max_attempts);
        }

        warn!(
            "⚠️ Ollama daemon did not become healthy after {} attempts",
            self.max_attempts
        );
        Err(self.startup_error(model, self.max_attempts))
    }

    fn startup_error(&self, model: &str, attempts: u32) -> GeneratorError {
        GeneratorError::DaemonStartup {
            base_url: self.client.base_url().to_string(),
            model: model.to_string(),
            attempts,
            remediation: ollama_remediation(model),
        }
    }
}
