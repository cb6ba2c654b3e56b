//! WiFi QR Runtime - Association engine
//!
//! One `connect` call runs one attempt through:
//! 1. Interface check
//! 2. Permission check (request, then prompt: open settings or decline)
//! 3. Secret validation
//! 4. Scan, retrying while the interface is busy
//! 5. Pick the strongest network
//! 6. Associate
//! 7. Classify failures, back off with jitter, retry
//!
//! Attempts deferred for permission resume when the gate signals a grant.

pub mod config;
pub mod backoff;
pub mod attempt;
pub mod prompt;
pub mod engine;

pub use config::*;
pub use backoff::*;
pub use attempt::*;
pub use prompt::*;
pub use engine::*;
