//! Scripted adapters
//!
//! Stand-ins for the OS boundaries. Each double is cheap to clone; clones
//! share the script and the call log, so a test keeps one clone for
//! assertions and hands the other to the engine.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use wifiqr_adapter::{
    GrantSignal, NetworkHandle, PermissionGate, PermissionGranted, PermissionStatus,
    WifiInterface,
};
use wifiqr_core::{AdapterError, Credential};
use wifiqr_runtime::{SettingsChoice, SettingsPrompt};

/// One recorded association call
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssociationCall {
    pub network: NetworkHandle,
    pub secret: Option<String>,
}

#[derive(Debug)]
struct WifiScript {
    available: bool,
    networks: Vec<NetworkHandle>,
    scans: VecDeque<Result<Vec<NetworkHandle>, AdapterError>>,
    associations: VecDeque<Result<(), AdapterError>>,
    association_latency: Duration,
    scan_calls: u32,
    calls: Vec<AssociationCall>,
    in_flight: u32,
    max_in_flight: u32,
    settings_opened: u32,
}

/// WiFi interface replaying queued scan and association results.
///
/// Once a queue runs dry, scans return the configured networks and
/// associations succeed.
#[derive(Clone, Debug)]
pub struct ScriptedWifi {
    script: Arc<Mutex<WifiScript>>,
}

impl ScriptedWifi {
    pub fn new(networks: Vec<NetworkHandle>) -> Self {
        ScriptedWifi {
            script: Arc::new(Mutex::new(WifiScript {
                available: true,
                networks,
                scans: VecDeque::new(),
                associations: VecDeque::new(),
                association_latency: Duration::ZERO,
                scan_calls: 0,
                calls: Vec::new(),
                in_flight: 0,
                max_in_flight: 0,
                settings_opened: 0,
            })),
        }
    }

    /// One network named `ssid` at a typical signal level
    pub fn single(ssid: &str) -> Self {
        Self::new(vec![NetworkHandle::new(ssid, -50)])
    }

    /// Interface missing entirely
    pub fn unavailable() -> Self {
        let wifi = Self::new(Vec::new());
        wifi.script.lock().available = false;
        wifi
    }

    pub fn with_association_latency(self, latency: Duration) -> Self {
        self.script.lock().association_latency = latency;
        self
    }

    pub fn push_scan(&self, result: Result<Vec<NetworkHandle>, AdapterError>) {
        self.script.lock().scans.push_back(result);
    }

    pub fn push_scan_failures(&self, count: usize, error: AdapterError) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.scans.push_back(Err(error.clone()));
        }
    }

    pub fn push_association(&self, result: Result<(), AdapterError>) {
        self.script.lock().associations.push_back(result);
    }

    pub fn push_association_failures(&self, count: usize, error: AdapterError) {
        let mut script = self.script.lock();
        for _ in 0..count {
            script.associations.push_back(Err(error.clone()));
        }
    }

    pub fn scan_calls(&self) -> u32 {
        self.script.lock().scan_calls
    }

    pub fn associate_calls(&self) -> u32 {
        self.script.lock().calls.len() as u32
    }

    pub fn associations(&self) -> Vec<AssociationCall> {
        self.script.lock().calls.clone()
    }

    /// Highest number of associations seen running at once
    pub fn max_in_flight(&self) -> u32 {
        self.script.lock().max_in_flight
    }

    pub fn settings_opened(&self) -> u32 {
        self.script.lock().settings_opened
    }
}

impl WifiInterface for ScriptedWifi {
    async fn interface_available(&self) -> bool {
        self.script.lock().available
    }

    async fn scan(&self, _ssid: &str) -> Result<Vec<NetworkHandle>, AdapterError> {
        let mut script = self.script.lock();
        script.scan_calls += 1;
        match script.scans.pop_front() {
            Some(result) => result,
            None => Ok(script.networks.clone()),
        }
    }

    async fn associate(
        &self,
        network: &NetworkHandle,
        secret: Option<&str>,
    ) -> Result<(), AdapterError> {
        let latency = {
            let mut script = self.script.lock();
            script.calls.push(AssociationCall {
                network: network.clone(),
                secret: secret.map(str::to_string),
            });
            script.in_flight += 1;
            script.max_in_flight = script.max_in_flight.max(script.in_flight);
            script.association_latency
        };

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut script = self.script.lock();
        script.in_flight -= 1;
        script.associations.pop_front().unwrap_or(Ok(()))
    }

    fn open_network_settings(&self) {
        self.script.lock().settings_opened += 1;
    }
}

#[derive(Debug)]
enum RequestOutcome {
    Answer(bool),
    Hang,
}

#[derive(Debug)]
struct GateScript {
    authorized: bool,
    request: RequestOutcome,
    requests: u32,
    settings_opened: u32,
}

/// Permission gate with a fixed answer to requests and a manual grant
#[derive(Clone, Debug)]
pub struct ScriptedGate {
    script: Arc<Mutex<GateScript>>,
    grants: GrantSignal,
}

impl ScriptedGate {
    fn with(authorized: bool, request: RequestOutcome) -> Self {
        ScriptedGate {
            script: Arc::new(Mutex::new(GateScript {
                authorized,
                request,
                requests: 0,
                settings_opened: 0,
            })),
            grants: GrantSignal::new(),
        }
    }

    pub fn authorized() -> Self {
        Self::with(true, RequestOutcome::Answer(true))
    }

    /// Not authorized; a request is granted
    pub fn grants_on_request() -> Self {
        Self::with(false, RequestOutcome::Answer(true))
    }

    /// Not authorized; a request is refused
    pub fn denied() -> Self {
        Self::with(false, RequestOutcome::Answer(false))
    }

    /// Not authorized; a request never resolves
    pub fn unresponsive() -> Self {
        Self::with(false, RequestOutcome::Hang)
    }

    /// The user enabled access in settings
    pub fn grant(&self) -> usize {
        let was_authorized = {
            let mut script = self.script.lock();
            std::mem::replace(&mut script.authorized, true)
        };
        if was_authorized {
            return 0;
        }
        self.grants.notify(PermissionStatus::Denied)
    }

    /// Publish a grant signal without touching the status
    pub fn notify_grant(&self) -> usize {
        self.grants.notify(PermissionStatus::Denied)
    }

    /// Authorization requests made so far
    pub fn requests(&self) -> u32 {
        self.script.lock().requests
    }

    pub fn settings_opened(&self) -> u32 {
        self.script.lock().settings_opened
    }

    pub fn grant_subscribers(&self) -> usize {
        self.grants.subscriber_count()
    }
}

impl PermissionGate for ScriptedGate {
    fn is_authorized(&self) -> bool {
        self.script.lock().authorized
    }

    async fn request_authorization(&self) -> bool {
        let answer = {
            let mut script = self.script.lock();
            script.requests += 1;
            match script.request {
                RequestOutcome::Answer(granted) => {
                    script.authorized = granted;
                    Some(granted)
                }
                RequestOutcome::Hang => None,
            }
        };

        match answer {
            Some(granted) => granted,
            None => std::future::pending().await,
        }
    }

    fn open_settings_panel(&self) {
        self.script.lock().settings_opened += 1;
    }

    fn subscribe_grants(&self) -> broadcast::Receiver<PermissionGranted> {
        self.grants.subscribe()
    }
}

/// Prompt with a fixed answer that records what it was shown
#[derive(Clone, Debug)]
pub struct ScriptedPrompt {
    choice: SettingsChoice,
    shown: Arc<Mutex<Vec<Credential>>>,
}

impl ScriptedPrompt {
    pub fn new(choice: SettingsChoice) -> Self {
        ScriptedPrompt {
            choice,
            shown: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn open_settings() -> Self {
        Self::new(SettingsChoice::OpenSettings)
    }

    pub fn decline() -> Self {
        Self::new(SettingsChoice::Decline)
    }

    pub fn shown(&self) -> Vec<Credential> {
        self.shown.lock().clone()
    }
}

impl SettingsPrompt for ScriptedPrompt {
    async fn choose(&self, credential: &Credential) -> SettingsChoice {
        self.shown.lock().push(credential.clone());
        self.choice
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_wifi_replays_then_defaults() {
        let wifi = ScriptedWifi::single("Home");
        wifi.push_scan(Err(AdapterError::new(16, "posix", "busy")));

        assert!(wifi.scan("Home").await.is_err());
        assert_eq!(wifi.scan("Home").await.unwrap().len(), 1);
        assert_eq!(wifi.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_gate_grant_notifies_once() {
        let gate = ScriptedGate::denied();
        let mut grants = gate.subscribe_grants();

        assert!(!gate.request_authorization().await);
        assert_eq!(gate.grant(), 1);
        assert_eq!(gate.grant(), 0);
        assert!(gate.is_authorized());
        assert_eq!(grants.recv().await.unwrap().previous, PermissionStatus::Denied);
    }
}
