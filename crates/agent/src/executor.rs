//! Command executor
//!
//! Assembles the full kubectl command line, runs it through the
//! [`SafetyGate`] and then the [`ClusterClient`]. Every path ends in an
//! [`Observation`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use chameleon_config::ClusterConfig;

use crate::kubectl::{ClusterClient, ClusterError};
use crate::safety::{SafetyGate, Verdict};
use crate::state::{ErrorKind, Observation};

/// Verbs that get the run's namespace appended when no scope is given
const READ_VERBS: &[&str] = &["get", "describe", "logs", "top", "events"];

/// Executor settings taken from the cluster config
#[derive(Debug, Clone)]
pub struct ExecutorSettings {
    pub kubectl_path: String,
    pub namespace: String,
    pub timeout_secs: u64,
    pub max_output_lines: usize,
    pub dry_run: bool,
}

impl From<&ClusterConfig> for ExecutorSettings {
    fn from(config: &ClusterConfig) -> Self {
        Self {
            kubectl_path: config.kubectl_path.clone(),
            namespace: config.namespace.clone(),
            timeout_secs: config.command_timeout_secs,
            max_output_lines: config.max_output_lines,
            dry_run: config.dry_run,
        }
    }
}

pub struct CommandExecutor {
    gate: SafetyGate,
    client: Arc<dyn ClusterClient>,
    settings: ExecutorSettings,
}

impl CommandExecutor {
    pub fn new(gate: SafetyGate, client: Arc<dyn ClusterClient>, settings: ExecutorSettings) -> Self {
        Self {
            gate,
            client,
            settings,
        }
    }

    pub fn from_config(config: &ClusterConfig, client: Arc<dyn ClusterClient>) -> Self {
        Self::new(SafetyGate::from_config(config), client, config.into())
    }

    pub fn gate(&self) -> &SafetyGate {
        &self.gate
    }

    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Full command line for a fragment such as `get pods`.
    ///
    /// A leading kubectl is dropped. Read verbs get `-n <namespace>` unless
    /// a scope flag is already present; other verbs are left unscoped.
    pub fn assemble(&self, fragment: &str, namespace: Option<&str>) -> String {
        let rest = self.strip_binary(fragment.trim());
        let tokens: Vec<&str> = rest.split_whitespace().collect();

        let is_read = tokens
            .first()
            .map(|verb| READ_VERBS.contains(&verb.to_lowercase().as_str()))
            .unwrap_or(false);

        let mut assembled = format!("{} {}", self.settings.kubectl_path, rest);
        if is_read && !has_scope_flag(&tokens) {
            let namespace = namespace.unwrap_or(&self.settings.namespace);
            assembled.push_str(&format!(" -n {}", namespace));
        }
        assembled
    }

    fn strip_binary<'a>(&self, fragment: &'a str) -> &'a str {
        let Some(first) = fragment.split_whitespace().next() else {
            return fragment;
        };

        let binary_name = Path::new(&self.settings.kubectl_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.settings.kubectl_path);

        if first == "kubectl" || first == self.settings.kubectl_path || first == binary_name {
            fragment[first.len()..].trim_start()
        } else {
            fragment
        }
    }

    /// Execute with the configured timeout
    pub async fn execute(&self, command: &str, namespace: Option<&str>) -> Observation {
        self.execute_with_timeout(command, namespace, self.settings.timeout_secs)
            .await
    }

    pub async fn execute_with_timeout(
        &self,
        command: &str,
        namespace: Option<&str>,
        timeout_secs: u64,
    ) -> Observation {
        if self.strip_binary(command.trim()).is_empty() {
            return Observation::failure(ErrorKind::InvalidArguments, "Empty command");
        }

        let assembled = self.assemble(command, namespace);

        if let Verdict::Blocked(reason) = self.gate.classify(&assembled) {
            return Observation::failure(
                ErrorKind::BlockedCommand,
                format!("Command blocked: {}", reason),
            );
        }

        if self.settings.dry_run {
            info!("◆ DRY RUN: {}", assembled);
            return Observation::ok(format!("[dry-run] would execute: {}", assembled));
        }

        let duration = Duration::from_secs(timeout_secs);
        let result =
            match tokio::time::timeout(duration, self.client.run(&assembled, timeout_secs)).await {
                Ok(result) => result,
                Err(_) => Err(ClusterError::Timeout(timeout_secs)),
            };

        match result {
            Ok(output) if output.exit_code == 0 => {
                debug!("◆ COMMAND OK: {}", assembled);
                let stdout = output.stdout.trim_end();
                if stdout.trim().is_empty() {
                    Observation::ok("(no output)")
                } else {
                    Observation::ok(truncate_lines(stdout, self.settings.max_output_lines))
                }
            }
            Ok(output) => {
                debug!("◆ COMMAND EXIT {}: {}", output.exit_code, assembled);
                let stderr = output.stderr.trim();
                let detail = if stderr.is_empty() {
                    format!("Command failed with exit code {}", output.exit_code)
                } else {
                    truncate_lines(stderr, self.settings.max_output_lines)
                };
                Observation::failure(ErrorKind::ExecutionFailed, detail)
            }
            Err(ClusterError::Timeout(secs)) => Observation::failure(
                ErrorKind::Timeout,
                format!("Command timed out after {} seconds", secs),
            ),
            Err(e) => Observation::failure(ErrorKind::ExecutionFailed, e.to_string()),
        }
    }
}

fn has_scope_flag(tokens: &[&str]) -> bool {
    tokens.iter().any(|t| {
        *t == "-n"
            || *t == "--namespace"
            || t.starts_with("--namespace=")
            || *t == "-A"
            || *t == "--all-namespaces"
            || (t.starts_with("-n") && t.len() > 2)
    })
}

/// Keep the first `max_lines` lines and note how many were dropped
pub fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }

    format!(
        "{}\n... ({} more lines truncated)",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}
