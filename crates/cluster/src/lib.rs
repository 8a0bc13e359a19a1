//! Natural-language cluster operations.
//!
//! A thin call-and-forward shell around the `kubectl ai` plugin: one
//! request string in, one text result out. The interesting parts are
//! the guards (both credential env vars must be present before anything
//! is spawned) and the bounded wait.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use df_domain::config::ClusterConfig;
use df_domain::error::{Error, Result};

/// Runs natural-language cluster requests through the configured CLI.
pub struct ClusterOps {
    config: ClusterConfig,
}

impl ClusterOps {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Translate and execute one natural-language request.
    ///
    /// Returns the tool's trimmed stdout on success. Missing env vars,
    /// spawn failures, non-zero exits, and the deadline all surface as
    /// [`Error::Cluster`] with the underlying detail.
    pub async fn run(&self, nl_input: &str) -> Result<String> {
        for var in [&self.config.api_key_env, &self.config.kubeconfig_env] {
            if std::env::var(var).map(|v| v.trim().is_empty()).unwrap_or(true) {
                return Err(Error::Cluster(format!(
                    "{var} environment variable is not set. Please set it and try again."
                )));
            }
        }

        tracing::info!(
            binary = %self.config.binary,
            model = %self.config.model,
            input = %nl_input,
            "running cluster request"
        );

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("ai")
            .arg("--llm-provider")
            .arg(&self.config.llm_provider)
            .arg("--model")
            .arg(&self.config.model)
            .arg("--skip-permissions")
            .arg("--quiet")
            .arg(nl_input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let wait = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(wait, cmd.output())
            .await
            .map_err(|_| {
                Error::Cluster(format!(
                    "request exceeded {}s deadline",
                    self.config.timeout_secs
                ))
            })?
            .map_err(|e| Error::Cluster(format!("failed to spawn {}: {e}", self.config.binary)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            tracing::warn!(status = ?output.status.code(), stderr = %stderr, "cluster command failed");
            return Err(Error::Cluster(if stderr.is_empty() {
                format!("command exited with status {:?}", output.status.code())
            } else {
                stderr
            }));
        }

        tracing::debug!(bytes = stdout.len(), "cluster command succeeded");
        Ok(stdout)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
