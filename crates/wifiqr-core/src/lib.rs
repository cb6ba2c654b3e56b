//! WiFi QR Core - Credential parsing and association primitives
//!
//! This crate defines the pieces shared by every WiFi QR crate:
//! - Credentials and the `WIFI:` payload parser
//! - Error taxonomy (adapter errors, classified outcomes)
//! - Retry classification policy
//! - Attempt states and progress events
//! - Payload feed for repeated scan deliveries

pub mod credential;
pub mod payload;
pub mod error;
pub mod policy;
pub mod state;
pub mod event;
pub mod feed;

pub use credential::*;
pub use payload::*;
pub use error::*;
pub use policy::*;
pub use state::*;
pub use event::*;
pub use feed::*;
