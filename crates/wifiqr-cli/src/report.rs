//! Rendering of credentials and progress for the terminal

use serde_json::{json, Value};

use wifiqr_core::{Credential, ProgressEvent};

/// Output flavor chosen on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

pub fn credential_json(credential: &Credential, reveal_secret: bool) -> Value {
    let mut value = json!({
        "ssid": credential.ssid(),
        "security": credential.security_label(),
        "has_secret": credential.secret().is_some(),
        "requires_secret": credential.requires_secret(),
    });
    if reveal_secret {
        value["secret"] = json!(credential.secret());
    }
    value
}

pub fn event_json(event: &ProgressEvent) -> Value {
    let mut value = json!({
        "event": event.name(),
        "attempt": event.attempt().map(|id| id.0),
    });

    let details = match event {
        ProgressEvent::Started { ssid, resumed, .. } => json!({ "ssid": ssid, "resumed": resumed }),
        ProgressEvent::StateChanged { state, .. } => json!({ "state": state.as_str() }),
        ProgressEvent::ScanRetrying {
            scan_attempt,
            delay,
            ..
        } => json!({
            "scan_attempt": scan_attempt,
            "delay_ms": delay.as_millis() as u64,
        }),
        ProgressEvent::Retrying {
            retry,
            delay,
            cause,
            ..
        } => json!({
            "retry": retry,
            "delay_ms": delay.as_millis() as u64,
            "code": cause.code,
            "domain": cause.domain,
            "message": cause.message,
        }),
        ProgressEvent::Deferred { ssid, .. }
        | ProgressEvent::Resuming { ssid }
        | ProgressEvent::Succeeded { ssid, .. } => json!({ "ssid": ssid }),
        ProgressEvent::Failed { ssid, error, .. } => json!({
            "ssid": ssid,
            "kind": error.kind(),
            "error": error.to_string(),
        }),
    };

    if let (Value::Object(target), Value::Object(extra)) = (&mut value, details) {
        target.extend(extra);
    }
    value
}

/// One line for a person watching; `None` for events not worth showing
pub fn event_line(event: &ProgressEvent) -> Option<String> {
    let line = match event {
        ProgressEvent::Started { ssid, resumed, .. } => {
            if *resumed {
                format!("Connecting to {ssid} (resumed)...")
            } else {
                format!("Connecting to {ssid}...")
            }
        }
        ProgressEvent::StateChanged { .. } => return None,
        ProgressEvent::ScanRetrying { delay, .. } => {
            format!("WiFi busy, rescanning in {}", humantime::format_duration(*delay))
        }
        ProgressEvent::Retrying {
            retry,
            delay,
            cause,
            ..
        } => format!(
            "Attempt {retry} failed ({cause}), retrying in {}",
            humantime::format_duration(*delay)
        ),
        ProgressEvent::Deferred { ssid, .. } => {
            format!("Waiting for WiFi permission before joining {ssid}")
        }
        ProgressEvent::Resuming { ssid } => format!("Permission granted, resuming {ssid}"),
        ProgressEvent::Succeeded { ssid, .. } => format!("Connected to {ssid}"),
        ProgressEvent::Failed { ssid, error, .. } => format!("Could not join {ssid}: {error}"),
    };
    Some(line)
}
