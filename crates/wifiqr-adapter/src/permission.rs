//! Permission gate
//!
//! Scanning for SSIDs can require an OS-level authorization (location access
//! on macOS). The engine talks to it through [`PermissionGate`] and learns
//! about later grants through a [`GrantSignal`] subscription.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

/// Default bound on an authorization request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Grant signals buffered per subscriber
const GRANT_CHANNEL_CAPACITY: usize = 8;

/// Authorization status reported by the OS
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PermissionStatus {
    #[default]
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
}

impl PermissionStatus {
    #[inline]
    pub fn is_authorized(self) -> bool {
        matches!(self, PermissionStatus::Authorized)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionStatus::NotDetermined => "Not Determined",
            PermissionStatus::Restricted => "Restricted",
            PermissionStatus::Denied => "Denied",
            PermissionStatus::Authorized => "Authorized",
        }
    }
}

/// Permission moved from an unauthorized status to authorized
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PermissionGranted {
    pub previous: PermissionStatus,
}

/// Broadcast channel carrying [`PermissionGranted`] signals
#[derive(Clone, Debug)]
pub struct GrantSignal {
    tx: broadcast::Sender<PermissionGranted>,
}

impl GrantSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(GRANT_CHANNEL_CAPACITY);
        GrantSignal { tx }
    }

    /// New subscription; dropping the receiver unsubscribes
    pub fn subscribe(&self) -> broadcast::Receiver<PermissionGranted> {
        self.tx.subscribe()
    }

    /// Publish a grant, returning how many subscribers saw it
    pub fn notify(&self, previous: PermissionStatus) -> usize {
        self.tx.send(PermissionGranted { previous }).unwrap_or(0)
    }

    /// Live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for GrantSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the OS authorization subsystem
#[trait_variant::make(Send)]
pub trait PermissionGate: Sync + 'static {
    /// Current status, without prompting
    fn is_authorized(&self) -> bool;

    /// Ask for authorization and wait for the answer.
    ///
    /// Implementations must resolve within a bounded time, falling back to
    /// the best known status.
    async fn request_authorization(&self) -> bool;

    /// Open the OS settings panel; fire and forget
    fn open_settings_panel(&self);

    /// Subscribe to grant signals, which may arrive at any time
    fn subscribe_grants(&self) -> broadcast::Receiver<PermissionGranted>;
}

/// Gate for platforms without a scan permission
#[derive(Clone, Debug, Default)]
pub struct AlwaysAuthorized {
    grants: GrantSignal,
}

impl AlwaysAuthorized {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionGate for AlwaysAuthorized {
    fn is_authorized(&self) -> bool {
        true
    }

    async fn request_authorization(&self) -> bool {
        true
    }

    fn open_settings_panel(&self) {}

    fn subscribe_grants(&self) -> broadcast::Receiver<PermissionGranted> {
        self.grants.subscribe()
    }
}

type Hook = Box<dyn Fn() + Send + Sync>;

/// Permission gate fed by status reports from the OS integration.
///
/// The integration calls [`report_status`](Self::report_status) whenever the
/// OS tells it the status changed. A pending
/// [`request_authorization`](PermissionGate::request_authorization) resolves
/// on the first determined status or after the request timeout, whichever
/// comes first.
pub struct PermissionBroker {
    status: watch::Sender<PermissionStatus>,
    grants: GrantSignal,
    request_timeout: Duration,
    on_request: Option<Hook>,
    on_open_settings: Option<Hook>,
}

impl PermissionBroker {
    pub fn new(initial: PermissionStatus) -> Self {
        let (status, _) = watch::channel(initial);
        PermissionBroker {
            status,
            grants: GrantSignal::new(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            on_request: None,
            on_open_settings: None,
        }
    }

    /// Bound on a pending authorization request
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Called when a request needs the OS to prompt the user
    pub fn on_request(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_request = Some(Box::new(hook));
        self
    }

    /// Called to open the settings panel
    pub fn on_open_settings(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open_settings = Some(Box::new(hook));
        self
    }

    /// Last status reported by the OS
    pub fn status(&self) -> PermissionStatus {
        *self.status.borrow()
    }

    /// Record a status change from the OS
    pub fn report_status(&self, status: PermissionStatus) {
        let previous = self.status.send_replace(status);
        if previous == status {
            return;
        }

        tracing::debug!(
            previous = previous.as_str(),
            current = status.as_str(),
            "permission status changed"
        );

        if !previous.is_authorized() && status.is_authorized() {
            let notified = self.grants.notify(previous);
            tracing::info!(subscribers = notified, "permission granted");
        }
    }
}

impl PermissionGate for PermissionBroker {
    fn is_authorized(&self) -> bool {
        self.status().is_authorized()
    }

    async fn request_authorization(&self) -> bool {
        let mut rx = self.status.subscribe();
        let current = *rx.borrow_and_update();
        match current {
            PermissionStatus::Authorized => return true,
            PermissionStatus::Denied | PermissionStatus::Restricted => return false,
            PermissionStatus::NotDetermined => {}
        }

        if let Some(hook) = &self.on_request {
            hook();
        }

        let determined = timeout(self.request_timeout, async {
            while rx.changed().await.is_ok() {
                if *rx.borrow_and_update() != PermissionStatus::NotDetermined {
                    break;
                }
            }
        })
        .await;

        if determined.is_err() {
            tracing::warn!(
                timeout_ms = self.request_timeout.as_millis() as u64,
                "permission request timed out, using last known status"
            );
        }

        self.is_authorized()
    }

    fn open_settings_panel(&self) {
        if let Some(hook) = &self.on_open_settings {
            hook();
        }
    }

    fn subscribe_grants(&self) -> broadcast::Receiver<PermissionGranted> {
        self.grants.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_request_short_circuits() {
        let granted = PermissionBroker::new(PermissionStatus::Authorized);
        assert!(granted.request_authorization().await);

        let denied = PermissionBroker::new(PermissionStatus::Denied);
        assert!(!denied.request_authorization().await);

        let restricted = PermissionBroker::new(PermissionStatus::Restricted);
        assert!(!restricted.request_authorization().await);
    }

    #[tokio::test]
    async fn test_request_resolves_on_report() {
        let prompts = Arc::new(AtomicUsize::new(0));
        let counter = prompts.clone();
        let broker = Arc::new(
            PermissionBroker::new(PermissionStatus::NotDetermined).on_request(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let reporter = broker.clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            reporter.report_status(PermissionStatus::Authorized);
        });

        assert!(broker.request_authorization().await);
        assert_eq!(prompts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_times_out_with_last_known_status() {
        let broker = PermissionBroker::new(PermissionStatus::NotDetermined)
            .with_request_timeout(Duration::from_secs(10));

        let start = tokio::time::Instant::now();
        assert!(!broker.request_authorization().await);
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[test]
    fn test_grant_signal_on_transition_only() {
        let broker = PermissionBroker::new(PermissionStatus::Denied);
        let mut rx = broker.subscribe_grants();

        broker.report_status(PermissionStatus::Denied);
        assert!(rx.try_recv().is_err());

        broker.report_status(PermissionStatus::Authorized);
        let signal = rx.try_recv().unwrap();
        assert_eq!(signal.previous, PermissionStatus::Denied);

        broker.report_status(PermissionStatus::Authorized);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_open_settings_hook() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = opened.clone();
        let broker = PermissionBroker::new(PermissionStatus::Denied).on_open_settings(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        broker.open_settings_panel();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_on_drop() {
        let signal = GrantSignal::new();
        let rx = signal.subscribe();
        assert_eq!(signal.subscriber_count(), 1);
        drop(rx);
        assert_eq!(signal.subscriber_count(), 0);
        assert_eq!(signal.notify(PermissionStatus::Denied), 0);
    }
}
