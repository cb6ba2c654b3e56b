//! Retry classification policy
//!
//! Adapter errors fall into three dispositions:
//! - Busy: the interface is temporarily occupied, retry the scan shortly
//! - Transient: retry the whole scan/associate cycle with backoff
//! - Fatal: give up on first occurrence
//!
//! The retry loop only ever asks a classifier; the code lists live here.

use crate::AdapterError;

/// POSIX EBUSY, reported by scans that collide with a system scan
pub const RESOURCE_BUSY_CODE: i64 = 16;

/// CoreWLAN error codes known to be transient
pub const COREWLAN_TRANSIENT_CODES: &[i64] = &[
    -3900, // generic
    -3901, // no memory
    -3902, // unknown
    -3903, // not supported
    -3904, // invalid parameter
    -3905, // no such property
    -3906, // no such SSID
    -3913, // operation not permitted
    -3924, // interface powered off
];

/// Error domains whose errors are always treated as transient
pub const COREWLAN_TRANSIENT_DOMAINS: &[&str] = &["com.apple.wifi.apple80211API.error"];

/// How the retry loop should react to an adapter error
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Interface busy; retry the scan after a short pause
    Busy,
    /// Temporary failure; retry with backoff
    Transient,
    /// Permanent failure; abort the attempt
    Fatal,
}

impl Disposition {
    /// Whether the outer retry loop may try again
    #[inline]
    pub fn is_retryable(self) -> bool {
        !matches!(self, Disposition::Fatal)
    }

    /// Name used in logs and JSON output
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Busy => "busy",
            Disposition::Transient => "transient",
            Disposition::Fatal => "fatal",
        }
    }
}

/// Maps adapter errors to a [`Disposition`]
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &AdapterError) -> Disposition;
}

/// Closed allow-list classifier.
///
/// A disposition attached by the adapter always wins. Otherwise busy codes map
/// to `Busy`, listed codes and domains to `Transient`, everything else to
/// `Fatal`.
#[derive(Clone, Debug, Default)]
pub struct AllowListClassifier {
    busy_codes: Vec<i64>,
    transient_codes: Vec<i64>,
    transient_domains: Vec<String>,
    transient_domain_fragments: Vec<String>,
}

impl AllowListClassifier {
    /// Empty list: every unhinted error is fatal
    pub fn new() -> Self {
        Self::default()
    }

    /// The macOS CoreWLAN list
    pub fn corewlan() -> Self {
        let mut classifier = Self::new()
            .with_busy_code(RESOURCE_BUSY_CODE)
            .with_transient_domain_fragment("CoreWLAN");
        for code in COREWLAN_TRANSIENT_CODES {
            classifier = classifier.with_transient_code(*code);
        }
        for domain in COREWLAN_TRANSIENT_DOMAINS {
            classifier = classifier.with_transient_domain(*domain);
        }
        classifier
    }

    /// Code meaning the interface is busy; retried inside the scan sub-loop
    pub fn with_busy_code(mut self, code: i64) -> Self {
        self.busy_codes.push(code);
        self
    }

    /// Code retried with backoff
    pub fn with_transient_code(mut self, code: i64) -> Self {
        self.transient_codes.push(code);
        self
    }

    /// Domain matched exactly
    pub fn with_transient_domain(mut self, domain: impl Into<String>) -> Self {
        self.transient_domains.push(domain.into());
        self
    }

    /// Domain matched by substring
    pub fn with_transient_domain_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.transient_domain_fragments.push(fragment.into());
        self
    }
}

impl ErrorClassifier for AllowListClassifier {
    fn classify(&self, error: &AdapterError) -> Disposition {
        if let Some(hint) = error.disposition {
            return hint;
        }

        if self.busy_codes.contains(&error.code) {
            return Disposition::Busy;
        }

        let domain_listed = self.transient_domains.iter().any(|d| *d == error.domain)
            || self
                .transient_domain_fragments
                .iter()
                .any(|f| error.domain.contains(f.as_str()));

        if self.transient_codes.contains(&error.code) || domain_listed {
            Disposition::Transient
        } else {
            Disposition::Fatal
        }
    }
}
