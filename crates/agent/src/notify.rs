//! Operator notification

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(format!(
                "unknown severity '{}' (expected info, warning or critical)",
                other
            )),
        }
    }
}

/// Notifier acknowledgement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyAck {
    pub delivered: bool,
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("◆ ALERT CHANNEL CLOSED")]
    ChannelClosed,
}

/// Operator notification collaborator
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str, severity: Severity) -> Result<NotifyAck, NotifyError>;
}

/// Prints alerts to stderr
pub struct ConsoleNotifier {
    enabled: bool,
}

impl ConsoleNotifier {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn notify(&self, message: &str, severity: Severity) -> Result<NotifyAck, NotifyError> {
        if !self.enabled {
            debug!("◆ ALERTS DISABLED, DROPPING: {}", message);
            return Ok(NotifyAck {
                delivered: false,
                detail: format!("Alerts disabled. Would have sent: {}", message),
            });
        }

        match severity {
            Severity::Info => info!("◆ ALERT [{}]: {}", severity, message),
            Severity::Warning => warn!("◆ ALERT [{}]: {}", severity, message),
            Severity::Critical => error!("◆ ALERT [{}]: {}", severity, message),
        }
        eprintln!("◆ ALERT [{}] {}", severity.as_str().to_uppercase(), message);

        Ok(NotifyAck {
            delivered: true,
            detail: format!("Alert sent ({}): {}", severity, message),
        })
    }
}

/// Alert delivered over a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Forwards alerts to an embedding host
#[derive(Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Alert>,
}

impl ChannelNotifier {
    pub fn new(sender: mpsc::UnboundedSender<Alert>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(&self, message: &str, severity: Severity) -> Result<NotifyAck, NotifyError> {
        let alert = Alert {
            message: message.to_string(),
            severity,
            timestamp: Utc::now(),
        };
        self.sender
            .send(alert)
            .map_err(|_| NotifyError::ChannelClosed)?;

        Ok(NotifyAck {
            delivered: true,
            detail: format!("Alert sent ({}): {}", severity, message),
        })
    }
}
