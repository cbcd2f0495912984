//! Common test utilities for Chameleon CLI tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Nothing listens here, so inference fails fast
pub const UNREACHABLE_HOST: &str = "http://127.0.0.1:9";

/// Isolated HOME with its own ~/.chameleon
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".chameleon");
        Ok(Self { temp_dir, data_dir })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    pub fn store_file(&self) -> PathBuf {
        self.data_dir.join("knowledge").join("store.json")
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.data_dir.join("runs")
    }

    /// Binary with HOME pointed at the temp dir and no inherited overrides
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_chameleon"));
        cmd.env("HOME", self.temp_dir.path());
        for key in [
            "OLLAMA_HOST",
            "OLLAMA_MODEL",
            "K8S_NAMESPACE",
            "MAX_ITERATIONS",
            "ALLOW_DESTRUCTIVE_COMMANDS",
            "DRY_RUN_MODE",
            "RUST_LOG",
        ] {
            cmd.env_remove(key);
        }
        cmd
    }

    /// Config pointing inference at an unreachable host
    pub fn create_config(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        let config = format!(
            r#"{{
  "inference": {{ "host": "{}", "timeout_secs": 5 }},
  "cluster": {{ "kubectl_path": "chameleon-no-such-kubectl", "dry_run": true }}
}}"#,
            UNREACHABLE_HOST
        );
        std::fs::write(self.config_file(), config)?;
        Ok(())
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
