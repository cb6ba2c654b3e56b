//! End-to-end association scenarios
//!
//! Every scenario runs on paused tokio time, so backoff and permission
//! timeouts elapse instantly and deterministically.

use tokio::sync::broadcast;

use wifiqr_core::{AdapterError, ProgressEvent};
use wifiqr_runtime::{AssociationEngine, EngineConfig};

use crate::{ScriptedGate, ScriptedPrompt, ScriptedWifi};

/// Engine type driven by the scripted adapters
pub type ScriptedEngine = AssociationEngine<ScriptedWifi, ScriptedGate, ScriptedPrompt>;

/// Default configuration with a fixed jitter seed
pub fn scenario_config() -> EngineConfig {
    EngineConfig::default().with_jitter_seed(7)
}

pub fn scenario_engine(
    wifi: &ScriptedWifi,
    gate: &ScriptedGate,
    prompt: &ScriptedPrompt,
) -> ScriptedEngine {
    AssociationEngine::with_config(wifi.clone(), gate.clone(), prompt.clone(), scenario_config())
}

/// CoreWLAN "generic error", retryable
pub fn transient_error() -> AdapterError {
    AdapterError::new(-3900, "com.apple.coreWLAN.error", "tmpErr")
}

/// Interface busy, retried at the scan level
pub fn busy_error() -> AdapterError {
    AdapterError::new(16, "NSPOSIXErrorDomain", "Resource busy")
}

/// Error no classifier retries
pub fn fatal_error() -> AdapterError {
    AdapterError::new(-1, "wifiqr.test", "credentials rejected")
}

/// Every event already buffered on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
