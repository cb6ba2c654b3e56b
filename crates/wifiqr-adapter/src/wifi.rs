//! WiFi subsystem boundary

use wifiqr_core::AdapterError;

/// One network found by a scan
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkHandle {
    /// Network name as advertised
    pub ssid: String,
    /// Access point hardware address, when the OS reports it
    pub bssid: Option<String>,
    /// Reported signal strength; higher is stronger
    pub signal: i32,
    /// Radio channel number
    pub channel: Option<u32>,
}

impl NetworkHandle {
    /// Handle with no BSSID or channel; `signal` is usually RSSI in dBm
    pub fn new(ssid: impl Into<String>, signal: i32) -> Self {
        NetworkHandle {
            ssid: ssid.into(),
            bssid: None,
            signal,
            channel: None,
        }
    }

    /// Pin the association to one access point
    pub fn with_bssid(mut self, bssid: impl Into<String>) -> Self {
        self.bssid = Some(bssid.into());
        self
    }

    /// Record the channel
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = Some(channel);
        self
    }
}

/// A single WiFi interface.
///
/// The interface is a shared stateful resource: callers must not run scans
/// or associations concurrently on it.
#[trait_variant::make(Send)]
pub trait WifiInterface: Sync + 'static {
    /// Whether a WiFi interface exists at all
    async fn interface_available(&self) -> bool;

    /// Scan for networks advertising `ssid`
    async fn scan(&self, ssid: &str) -> Result<Vec<NetworkHandle>, AdapterError>;

    /// Join `network`, with a password for secured networks
    async fn associate(
        &self,
        network: &NetworkHandle,
        secret: Option<&str>,
    ) -> Result<(), AdapterError>;

    /// Open the OS network settings, if the platform has them
    fn open_network_settings(&self) {}
}
