//! WiFi QR Test Harness - Scripted adapters and scenario validation
//!
//! This crate provides:
//! - Scripted WiFi interface, permission gate and prompt
//! - Seeded payload fuzzing
//! - End-to-end association scenarios on virtual time

pub mod scripted;
pub mod fuzzer;
pub mod integration;

pub use scripted::*;
pub use fuzzer::*;
pub use integration::*;
