//! Command safety gate
//!
//! Pure classification of a fully assembled command line. Namespace and
//! bulk deletion are always refused; the destructive verb set is refused
//! unless the override is configured.

use std::fmt;
use tracing::warn;

use chameleon_config::ClusterConfig;

const NAMESPACE_KINDS: &[&str] = &["namespace", "namespaces", "ns"];

/// Chaining and substitution sequences, checked in order
const METACHARACTERS: &[&str] = &["&&", "|", ";", "`", "$("];

/// Why a command was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    NamespaceDeletion,
    BulkDeletion,
    ShellMetacharacter(String),
    DestructiveVerb(String),
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::NamespaceDeletion => write!(f, "deleting a namespace is never allowed"),
            BlockReason::BulkDeletion => write!(f, "bulk deletion with --all is never allowed"),
            BlockReason::ShellMetacharacter(pattern) => {
                write!(f, "shell metacharacter '{}' is not allowed", pattern)
            }
            BlockReason::DestructiveVerb(verb) => write!(
                f,
                "destructive verb '{}' is disabled (set allow_destructive_commands to enable)",
                verb
            ),
        }
    }
}

/// Gate decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked(BlockReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allowed)
    }
}

/// Stateless command classifier
#[derive(Debug, Clone)]
pub struct SafetyGate {
    destructive_verbs: Vec<String>,
    allow_destructive: bool,
}

impl SafetyGate {
    pub fn new<S: AsRef<str>>(destructive_verbs: &[S], allow_destructive: bool) -> Self {
        Self {
            destructive_verbs: destructive_verbs
                .iter()
                .map(|v| v.as_ref().trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
            allow_destructive,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self::new(config.destructive_verbs.as_slice(), config.allow_destructive_commands)
    }

    pub fn allow_destructive(&self) -> bool {
        self.allow_destructive
    }

    pub fn classify(&self, command: &str) -> Verdict {
        match self.check(command) {
            Some(reason) => {
                warn!("◆ COMMAND BLOCKED: {} ({})", command, reason);
                Verdict::Blocked(reason)
            }
            None => Verdict::Allowed,
        }
    }

    fn check(&self, command: &str) -> Option<BlockReason> {
        let lowered = command.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split_whitespace()
            .map(|t| t.trim_matches(|c| c == '\'' || c == '"'))
            .collect();

        // Everything after a `delete` token, flags included
        if let Some(at) = tokens.iter().position(|t| *t == "delete") {
            let rest = &tokens[at + 1..];
            if rest
                .iter()
                .filter(|t| !t.starts_with('-'))
                .any(|t| names_namespace(t))
            {
                return Some(BlockReason::NamespaceDeletion);
            }
            if rest.iter().any(|t| is_bulk_flag(t)) {
                return Some(BlockReason::BulkDeletion);
            }
        }

        if let Some(pattern) = METACHARACTERS.iter().find(|p| command.contains(**p)) {
            return Some(BlockReason::ShellMetacharacter(pattern.to_string()));
        }
        if !self.allow_destructive {
            let verb = tokens
                .iter()
                .find(|token| self.destructive_verbs.iter().any(|v| v == **token));
            if let Some(verb) = verb {
                return Some(BlockReason::DestructiveVerb(verb.to_string()));
            }
        }
        None
    }
}

/// `namespace`, `ns/name`, or a comma list such as `ns,pods`
fn names_namespace(token: &str) -> bool {
    token.split(',').any(|part| {
        let kind = part.split('/').next().unwrap_or(part);
        NAMESPACE_KINDS.contains(&kind)
    })
}

fn is_bulk_flag(token: &str) -> bool {
    let flag = token.split('=').next().unwrap_or(token);
    matches!(flag, "--all" | "--all-namespaces" | "-a")
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::from_config(&ClusterConfig::default())
    }
}
