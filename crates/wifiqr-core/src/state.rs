//! Association attempt states

/// Where an association attempt currently stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum AttemptState {
    #[default]
    Idle,
    CheckingPermission,
    Scanning,
    Associating,
    Connected,
    /// Waiting for permission; resumes on a grant signal
    Deferred,
    Failed,
}

impl AttemptState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::CheckingPermission => "CheckingPermission",
            Self::Scanning => "Scanning",
            Self::Associating => "Associating",
            Self::Connected => "Connected",
            Self::Deferred => "Deferred",
            Self::Failed => "Failed",
        }
    }

    /// Ends the attempt (Deferred counts: it resumes as a new attempt)
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Connected | Self::Deferred | Self::Failed)
    }

    /// An attempt is in flight
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::CheckingPermission | Self::Scanning | Self::Associating
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_flags() {
        assert!(!AttemptState::Idle.is_terminal());
        assert!(!AttemptState::Idle.is_active());
        assert!(AttemptState::Scanning.is_active());
        assert!(AttemptState::Deferred.is_terminal());
        assert!(!AttemptState::Deferred.is_active());
        assert_eq!(AttemptState::default(), AttemptState::Idle);
        assert_eq!(AttemptState::Associating.as_str(), "Associating");
    }
}
