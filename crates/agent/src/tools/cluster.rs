//! Argument handling for the kubectl-backed tools

use regex::Regex;
use std::sync::LazyLock;

use super::{required, ToolKind};
use crate::state::ActionRequest;

static DNS_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$").expect("dns label pattern")
});

const DEFAULT_TAIL: u32 = 100;

/// A kubectl fragment plus the namespace to scope it to
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClusterCommand {
    pub fragment: String,
    pub namespace: String,
}

pub(crate) fn build_command(
    kind: ToolKind,
    action: &ActionRequest,
    run_namespace: &str,
) -> Result<ClusterCommand, String> {
    let namespace = match action.arg("namespace") {
        Some(ns) if DNS_LABEL.is_match(ns) => ns.to_string(),
        Some(ns) => return Err(format!("Invalid namespace '{}'", ns)),
        None => run_namespace.to_string(),
    };

    let fragment = match kind {
        ToolKind::ExecuteCommand => required(action, "command")?.to_string(),
        ToolKind::ReadLogs => {
            let pod = name_arg(action, "pod_name")?;
            let tail = match action.arg("tail") {
                Some(raw) => raw
                    .parse::<u32>()
                    .map_err(|_| format!("Argument 'tail' must be a positive integer, got '{}'", raw))?,
                None => DEFAULT_TAIL,
            };
            let mut fragment = format!("logs {} --tail={}", pod, tail);
            if action.arg("container").is_some() {
                fragment.push_str(&format!(" -c {}", name_arg(action, "container")?));
            }
            fragment
        }
        ToolKind::DescribeResource => format!(
            "describe {} {}",
            name_arg(action, "resource_type")?,
            name_arg(action, "name")?
        ),
        // Mutations are not auto-scoped by the executor, so scope explicitly
        ToolKind::RestartDeployment => format!(
            "rollout restart deployment/{} -n {}",
            name_arg(action, "deployment_name")?,
            namespace
        ),
        ToolKind::SearchKnowledge | ToolKind::Notify => {
            return Err(format!("{} is not a cluster tool", kind.name()))
        }
    };

    Ok(ClusterCommand {
        fragment,
        namespace,
    })
}

/// A single-token resource name
fn name_arg<'a>(action: &'a ActionRequest, key: &str) -> Result<&'a str, String> {
    let value = required(action, key)?;
    if value.starts_with('-') || value.chars().any(char::is_whitespace) {
        return Err(format!("Argument '{}' must be a single name, got '{}'", key, value));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(action: ActionRequest) -> Result<ClusterCommand, String> {
        let kind = ToolKind::from_name(&action.tool_name).unwrap();
        build_command(kind, &action, "default")
    }

    #[test]
    fn test_execute_command_passes_fragment() {
        let cmd = build(ActionRequest::new("execute_k8s_command").with_arg("command", "get pods")).unwrap();
        assert_eq!(cmd.fragment, "get pods");
        assert_eq!(cmd.namespace, "default");
    }

    #[test]
    fn test_logs_defaults_and_container() {
        let cmd = build(ActionRequest::new("get_pod_logs").with_arg("pod_name", "web-1")).unwrap();
        assert_eq!(cmd.fragment, "logs web-1 --tail=100");

        let cmd = build(
            ActionRequest::new("get_pod_logs")
                .with_arg("pod_name", "web-1")
                .with_arg("tail", "20")
                .with_arg("container", "sidecar")
                .with_arg("namespace", "payments"),
        )
        .unwrap();
        assert_eq!(cmd.fragment, "logs web-1 --tail=20 -c sidecar");
        assert_eq!(cmd.namespace, "payments");
    }

    #[test]
    fn test_logs_rejects_bad_tail() {
        let err = build(
            ActionRequest::new("get_pod_logs")
                .with_arg("pod_name", "web-1")
                .with_arg("tail", "lots"),
        )
        .unwrap_err();
        assert!(err.contains("tail"));
    }

    #[test]
    fn test_describe_requires_both_fields() {
        let cmd = build(
            ActionRequest::new("describe_resource")
                .with_arg("resource_type", "deployment")
                .with_arg("name", "api"),
        )
        .unwrap();
        assert_eq!(cmd.fragment, "describe deployment api");

        let err = build(ActionRequest::new("describe_resource").with_arg("resource_type", "pod")).unwrap_err();
        assert!(err.contains("'name'"));
    }

    #[test]
    fn test_restart_scopes_explicitly() {
        let cmd = build(ActionRequest::new("restart_deployment").with_arg("deployment_name", "api")).unwrap();
        assert_eq!(cmd.fragment, "rollout restart deployment/api -n default");
    }

    #[test]
    fn test_rejects_flag_injection_in_names() {
        assert!(build(ActionRequest::new("get_pod_logs").with_arg("pod_name", "web-1 --all")).is_err());
        assert!(build(ActionRequest::new("get_pod_logs").with_arg("pod_name", "--all")).is_err());
        assert!(build(
            ActionRequest::new("execute_k8s_command")
                .with_arg("command", "get pods")
                .with_arg("namespace", "prod -A")
        )
        .is_err());
        assert!(build(
            ActionRequest::new("execute_k8s_command")
                .with_arg("command", "get pods")
                .with_arg("namespace", "Prod_1")
        )
        .is_err());
    }
}
