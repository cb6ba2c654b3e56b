//! WiFi QR Adapters - Boundaries to the OS
//!
//! This crate provides:
//! - Permission gate trait and grant signal channel
//! - Reference permission broker with a bounded request
//! - WiFi interface trait (scan, associate)
//! - NetworkManager adapter driven through `nmcli`

pub mod permission;
pub mod wifi;
pub mod nmcli;

pub use permission::*;
pub use wifi::*;
pub use nmcli::NmcliWifi;
