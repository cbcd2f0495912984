//! Cluster client: runs kubectl without a shell

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Raw process result
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Failures before a process produced an exit status
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("◆ SPAWN FAILED: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("◆ TIMEOUT AFTER {0} SECONDS")]
    Timeout(u64),

    #[error("◆ UNPARSABLE COMMAND: {0}")]
    Parse(String),
}

/// External cluster client
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn run(&self, command: &str, timeout_secs: u64) -> Result<CommandOutput, ClusterError>;
}

/// Spawns the command's argv directly
#[derive(Debug, Clone, Default)]
pub struct KubectlClient;

impl KubectlClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ClusterClient for KubectlClient {
    async fn run(&self, command: &str, timeout_secs: u64) -> Result<CommandOutput, ClusterError> {
        let argv = shell_words::split(command).map_err(|e| ClusterError::Parse(e.to_string()))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ClusterError::Parse("empty command".to_string()))?;

        debug!("◆ EXECUTING: {}", command);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output())
            .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ClusterError::Timeout(timeout_secs)),
        };

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_argv_without_shell() {
        let output = KubectlClient::new()
            .run("echo 'get pods' && whoami", 5)
            .await
            .unwrap();

        assert_eq!(output.exit_code, 0);
        // No shell, so && is passed through as an argument
        assert_eq!(output.stdout.trim(), "get pods && whoami");
    }

    #[tokio::test]
    async fn test_nonzero_exit_and_stderr() {
        let output = KubectlClient::new()
            .run("ls /definitely/not/here", 5)
            .await
            .unwrap();
        assert_ne!(output.exit_code, 0);
        assert!(!output.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let result = KubectlClient::new()
            .run("chameleon-no-such-binary get pods", 5)
            .await;
        assert!(matches!(result, Err(ClusterError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let result = KubectlClient::new().run("sleep 5", 1).await;
        assert!(matches!(result, Err(ClusterError::Timeout(1))));
    }

    #[tokio::test]
    async fn test_unbalanced_quotes_rejected() {
        let result = KubectlClient::new().run("get pod 'web", 5).await;
        assert!(matches!(result, Err(ClusterError::Parse(_))));
        let result = KubectlClient::new().run("   ", 5).await;
        assert!(matches!(result, Err(ClusterError::Parse(_))));
    }
}
