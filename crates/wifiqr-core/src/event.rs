//! Progress notifications for a presentation layer
//!
//! Events are advisory. Nothing in the engine depends on them being received.

use std::time::Duration;

use crate::{AdapterError, AttemptState, ClassifiedError};

/// Identifies one association attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttemptId(pub u64);

/// Progress of an association attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A new attempt began
    Started {
        attempt: AttemptId,
        ssid: String,
        /// Started by a permission grant rather than a caller
        resumed: bool,
    },
    StateChanged {
        attempt: AttemptId,
        state: AttemptState,
    },
    /// Interface busy, scanning again after `delay`
    ScanRetrying {
        attempt: AttemptId,
        scan_attempt: u32,
        delay: Duration,
    },
    /// Transient failure, whole cycle retries after `delay`
    Retrying {
        attempt: AttemptId,
        retry: u32,
        delay: Duration,
        cause: AdapterError,
    },
    /// Suspended until permission is granted
    Deferred { attempt: AttemptId, ssid: String },
    /// A deferred credential is about to be retried
    Resuming { ssid: String },
    Succeeded { attempt: AttemptId, ssid: String },
    Failed {
        attempt: AttemptId,
        ssid: String,
        error: ClassifiedError,
    },
}

impl ProgressEvent {
    /// Attempt the event belongs to, if any
    pub fn attempt(&self) -> Option<AttemptId> {
        match self {
            ProgressEvent::Started { attempt, .. }
            | ProgressEvent::StateChanged { attempt, .. }
            | ProgressEvent::ScanRetrying { attempt, .. }
            | ProgressEvent::Retrying { attempt, .. }
            | ProgressEvent::Deferred { attempt, .. }
            | ProgressEvent::Succeeded { attempt, .. }
            | ProgressEvent::Failed { attempt, .. } => Some(*attempt),
            ProgressEvent::Resuming { .. } => None,
        }
    }

    /// Short stable name
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Started { .. } => "started",
            ProgressEvent::StateChanged { .. } => "state_changed",
            ProgressEvent::ScanRetrying { .. } => "scan_retrying",
            ProgressEvent::Retrying { .. } => "retrying",
            ProgressEvent::Deferred { .. } => "deferred",
            ProgressEvent::Resuming { .. } => "resuming",
            ProgressEvent::Succeeded { .. } => "succeeded",
            ProgressEvent::Failed { .. } => "failed",
        }
    }

    /// Final event of an attempt
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Deferred { .. }
                | ProgressEvent::Succeeded { .. }
                | ProgressEvent::Failed { .. }
        )
    }
}
