//! Per-attempt bookkeeping

use wifiqr_adapter::NetworkHandle;
use wifiqr_core::{AdapterError, AttemptId, AttemptState, Credential};

/// Successful association
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connected {
    pub attempt: AttemptId,
    pub network: NetworkHandle,
    /// Failed cycles before the successful one
    pub retries: u32,
}

/// State of one `connect` call, discarded when it ends
#[derive(Debug)]
pub struct AssociationAttempt {
    pub id: AttemptId,
    pub credential: Credential,
    pub resumed: bool,
    pub scan_retry_count: u32,
    pub association_retry_count: u32,
    pub last_error: Option<AdapterError>,
    state: AttemptState,
}

impl AssociationAttempt {
    pub fn new(id: AttemptId, credential: Credential, resumed: bool) -> Self {
        AssociationAttempt {
            id,
            credential,
            resumed,
            scan_retry_count: 0,
            association_retry_count: 0,
            last_error: None,
            state: AttemptState::Idle,
        }
    }

    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Move to `state`, returning whether it changed
    pub fn transition(&mut self, state: AttemptState) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        true
    }

    /// Count a failed scan inside the current cycle
    pub fn record_scan_failure(&mut self, error: &AdapterError) {
        self.scan_retry_count += 1;
        self.last_error = Some(error.clone());
    }

    /// Count a failed cycle, returning the new retry count
    pub fn record_cycle_failure(&mut self, error: &AdapterError) -> u32 {
        self.association_retry_count += 1;
        self.last_error = Some(error.clone());
        self.association_retry_count
    }
}
