//! Operator alert tool

use super::required;
use crate::notify::{Notifier, Severity};
use crate::state::{ActionRequest, ErrorKind, Observation};

pub(crate) async fn send(notifier: &dyn Notifier, action: &ActionRequest) -> Observation {
    let message = match required(action, "message") {
        Ok(message) => message,
        Err(e) => return Observation::failure(ErrorKind::InvalidArguments, e),
    };

    let severity = match action.arg("severity").map(str::parse::<Severity>) {
        Some(Ok(severity)) => severity,
        Some(Err(e)) => return Observation::failure(ErrorKind::InvalidArguments, e),
        None => Severity::default(),
    };

    match notifier.notify(message, severity).await {
        Ok(ack) => Observation::ok(ack.detail),
        Err(e) => Observation::failure(ErrorKind::ExecutionFailed, e.to_string()),
    }
}
