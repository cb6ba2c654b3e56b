//! Error types for WiFi QR

use thiserror::Error;

use crate::Disposition;

/// Why a payload was rejected by the parser
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Payload does not start with the WIFI: prefix")]
    MissingPrefix,

    #[error("Payload has no non-empty SSID field")]
    MissingSsid,
}

/// Error reported by a WiFi or permission adapter.
///
/// The engine never inspects `code` or `domain` itself; they are handed to an
/// [`ErrorClassifier`](crate::ErrorClassifier). An adapter that already knows
/// whether a failure is transient can say so through `disposition`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{domain} error {code}: {message}")]
pub struct AdapterError {
    /// Native error code
    pub code: i64,
    /// Error domain the code belongs to
    pub domain: String,
    /// Human readable description
    pub message: String,
    /// Classification supplied by the adapter, if any
    pub disposition: Option<Disposition>,
}

impl AdapterError {
    pub fn new(code: i64, domain: impl Into<String>, message: impl Into<String>) -> Self {
        AdapterError {
            code,
            domain: domain.into(),
            message: message.into(),
            disposition: None,
        }
    }

    /// Attach the adapter's own classification
    pub fn with_disposition(mut self, disposition: Disposition) -> Self {
        self.disposition = Some(disposition);
        self
    }
}

/// Terminal outcome of a failed association attempt
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedError {
    #[error("No WiFi interface available")]
    NoInterface,

    #[error("Network not found")]
    NetworkNotFound,

    #[error("Network requires a password but none was provided")]
    MissingSecret,

    #[error("Permission to access WiFi networks was denied")]
    PermissionDenied,

    #[error("Waiting for permission to be granted in settings")]
    UserDeferred,

    #[error("Max retries exceeded. Last error: {0}")]
    RetriesExhausted(AdapterError),

    #[error("Connection failed: {0}")]
    Fatal(AdapterError),
}

impl ClassifiedError {
    /// A deferral is a suspension, not a failure
    pub fn is_deferral(&self) -> bool {
        matches!(self, ClassifiedError::UserDeferred)
    }

    /// Adapter error behind this outcome, if any
    pub fn cause(&self) -> Option<&AdapterError> {
        match self {
            ClassifiedError::RetriesExhausted(cause) | ClassifiedError::Fatal(cause) => Some(cause),
            _ => None,
        }
    }

    /// Short stable name for logs and machine-readable output
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifiedError::NoInterface => "no_interface",
            ClassifiedError::NetworkNotFound => "network_not_found",
            ClassifiedError::MissingSecret => "missing_secret",
            ClassifiedError::PermissionDenied => "permission_denied",
            ClassifiedError::UserDeferred => "user_deferred",
            ClassifiedError::RetriesExhausted(_) => "retries_exhausted",
            ClassifiedError::Fatal(_) => "fatal",
        }
    }
}

/// Result type for association operations
pub type AssociationResult<T> = Result<T, ClassifiedError>;
