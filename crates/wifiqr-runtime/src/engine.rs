//! Association engine - permission, scan, associate, retry

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::Instrument;

use wifiqr_adapter::{NetworkHandle, PermissionGate, WifiInterface};
use wifiqr_core::{
    AdapterError, AllowListClassifier, AssociationResult, AttemptId, AttemptState,
    ClassifiedError, Credential, Disposition, ErrorClassifier, ProgressEvent,
};

use crate::{
    AssociationAttempt, Backoff, Connected, EngineConfig, SettingsChoice, SettingsPrompt,
};

/// Pick the network with the highest signal; ties keep the first seen
pub fn strongest(networks: Vec<NetworkHandle>) -> Option<NetworkHandle> {
    networks
        .into_iter()
        .reduce(|best, candidate| if candidate.signal > best.signal { candidate } else { best })
}

/// Turns credentials into an established association.
///
/// At most one attempt runs at a time; further `connect` calls wait for the
/// active one to finish. Cloning is cheap and clones share all state.
pub struct AssociationEngine<W, P, U> {
    inner: Arc<Inner<W, P, U>>,
}

impl<W, P, U> Clone for AssociationEngine<W, P, U> {
    fn clone(&self) -> Self {
        AssociationEngine {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<W, P, U> {
    wifi: W,
    gate: P,
    prompt: U,
    classifier: Arc<dyn ErrorClassifier>,
    config: EngineConfig,
    backoff: Backoff,
    /// Serializes attempts on the single interface
    attempt_lock: tokio::sync::Mutex<()>,
    /// Credential of the attempt deferred for permission
    pending: Mutex<Option<Credential>>,
    state: Mutex<AttemptState>,
    events: broadcast::Sender<ProgressEvent>,
    next_attempt: AtomicU64,
}

/// Why one scan/associate cycle failed
enum CycleFailure {
    NotFound,
    Adapter(AdapterError),
}

impl<W, P, U> AssociationEngine<W, P, U>
where
    W: WifiInterface + Send,
    P: PermissionGate + Send,
    U: SettingsPrompt + Send,
{
    /// Create an engine with default configuration and the CoreWLAN
    /// classification list
    pub fn new(wifi: W, gate: P, prompt: U) -> Self {
        Self::with_config(wifi, gate, prompt, EngineConfig::default())
    }

    pub fn with_config(wifi: W, gate: P, prompt: U, config: EngineConfig) -> Self {
        Self::with_classifier(
            wifi,
            gate,
            prompt,
            config,
            Arc::new(AllowListClassifier::corewlan()),
        )
    }

    pub fn with_classifier(
        wifi: W,
        gate: P,
        prompt: U,
        config: EngineConfig,
        classifier: Arc<dyn ErrorClassifier>,
    ) -> Self {
        let config = config.sanitized();
        let (events, _) = broadcast::channel(config.event_capacity);

        AssociationEngine {
            inner: Arc::new(Inner {
                wifi,
                gate,
                prompt,
                classifier,
                backoff: Backoff::new(&config),
                config,
                attempt_lock: tokio::sync::Mutex::new(()),
                pending: Mutex::new(None),
                state: Mutex::new(AttemptState::Idle),
                events,
                next_attempt: AtomicU64::new(0),
            }),
        }
    }

    /// Run one association attempt to its end.
    ///
    /// Waits for any attempt already in flight. `UserDeferred` means the
    /// credential was parked until permission is granted; see
    /// [`watch_grants`](Self::watch_grants).
    pub async fn connect(&self, credential: &Credential) -> AssociationResult<Connected> {
        let abandoned = AtomicBool::new(false);
        self.inner.connect(credential, &abandoned).await
    }

    /// Run an attempt in the background
    pub fn spawn_connect(&self, credential: Credential) -> AttemptHandle {
        let inner = Arc::clone(&self.inner);
        let abandoned = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&abandoned);

        let task = tokio::spawn(async move { inner.connect(&credential, &flag).await });

        AttemptHandle { task, abandoned }
    }

    /// Resume deferred attempts whenever the gate signals a grant.
    ///
    /// The subscription lives as long as the returned watcher.
    pub fn watch_grants(&self) -> GrantWatcher {
        let mut grants = self.inner.gate.subscribe_grants();
        let weak: Weak<Inner<W, P, U>> = Arc::downgrade(&self.inner);

        let task = tokio::spawn(async move {
            loop {
                match grants.recv().await {
                    Ok(signal) => {
                        let Some(inner) = weak.upgrade() else {
                            break;
                        };
                        tracing::debug!(previous = signal.previous.as_str(), "grant signal");
                        inner.resume_pending().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "grant signals lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        GrantWatcher { task }
    }

    /// Progress events of every attempt from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.inner.events.subscribe()
    }

    /// State of the latest attempt
    pub fn state(&self) -> AttemptState {
        *self.inner.state.lock()
    }

    /// Credential waiting for a permission grant
    pub fn pending_credential(&self) -> Option<Credential> {
        self.inner.pending.lock().clone()
    }

    /// Drop the deferred credential so a grant does not resume it
    pub fn discard_pending(&self) -> Option<Credential> {
        self.inner.pending.lock().take()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn wifi(&self) -> &W {
        &self.inner.wifi
    }

    pub fn gate(&self) -> &P {
        &self.inner.gate
    }
}

impl<W, P, U> Inner<W, P, U>
where
    W: WifiInterface + Send,
    P: PermissionGate + Send,
    U: SettingsPrompt + Send,
{
    /// Explicit attempt; supersedes any deferred credential
    async fn connect(
        &self,
        credential: &Credential,
        abandoned: &AtomicBool,
    ) -> AssociationResult<Connected> {
        let _guard = self.attempt_lock.lock().await;

        if self.pending.lock().take().is_some() {
            tracing::debug!("new attempt supersedes deferred credential");
        }

        self.run_locked(credential, false, abandoned).await
    }

    /// Resume the deferred credential, if one is still parked once the
    /// attempt lock is held
    async fn resume_pending(&self) {
        if self.pending.lock().is_none() {
            tracing::debug!("grant signal with nothing deferred");
            return;
        }

        sleep(self.config.resume_delay).await;

        let _guard = self.attempt_lock.lock().await;
        let Some(credential) = self.pending.lock().take() else {
            tracing::debug!("deferred credential superseded before resuming");
            return;
        };

        tracing::info!(ssid = %credential.ssid(), "permission granted, resuming deferred attempt");
        let _ = self.events.send(ProgressEvent::Resuming {
            ssid: credential.ssid().to_string(),
        });

        let abandoned = AtomicBool::new(false);
        let _ = self.run_locked(&credential, true, &abandoned).await;
    }

    /// Run one attempt; the caller holds `attempt_lock`
    async fn run_locked(
        &self,
        credential: &Credential,
        resumed: bool,
        abandoned: &AtomicBool,
    ) -> AssociationResult<Connected> {
        let id = AttemptId(self.next_attempt.fetch_add(1, Ordering::Relaxed) + 1);
        let span = tracing::info_span!("attempt", id = id.0, ssid = %credential.ssid());

        let mut run = AttemptRun {
            inner: self,
            attempt: AssociationAttempt::new(id, credential.clone(), resumed),
            abandoned,
        };

        async move {
            let mut interrupted = InterruptGuard {
                pending: &self.pending,
                state: &self.state,
                reparked: resumed.then(|| credential.clone()),
                armed: true,
            };

            run.emit(ProgressEvent::Started {
                attempt: id,
                ssid: credential.ssid().to_string(),
                resumed,
            });

            let outcome = run.run().await;
            run.finish(&outcome);
            interrupted.armed = false;
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Restores engine state when an attempt future is dropped before it ends.
///
/// A dropped resumed attempt goes back to the pending slot unless a newer
/// credential took it meanwhile.
struct InterruptGuard<'a> {
    pending: &'a Mutex<Option<Credential>>,
    state: &'a Mutex<AttemptState>,
    reparked: Option<Credential>,
    armed: bool,
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match self.reparked.take() {
            Some(credential) => {
                let mut pending = self.pending.lock();
                if pending.is_none() {
                    *pending = Some(credential);
                }
                *self.state.lock() = AttemptState::Deferred;
            }
            None => *self.state.lock() = AttemptState::Idle,
        }
        tracing::debug!("attempt interrupted before completion");
    }
}

/// One attempt in flight
struct AttemptRun<'a, W, P, U> {
    inner: &'a Inner<W, P, U>,
    attempt: AssociationAttempt,
    abandoned: &'a AtomicBool,
}

impl<'a, W, P, U> AttemptRun<'a, W, P, U>
where
    W: WifiInterface + Send,
    P: PermissionGate + Send,
    U: SettingsPrompt + Send,
{
    fn emit(&self, event: ProgressEvent) {
        if !self.abandoned.load(Ordering::Relaxed) {
            let _ = self.inner.events.send(event);
        }
    }

    fn transition(&mut self, state: AttemptState) {
        if self.attempt.transition(state) {
            *self.inner.state.lock() = state;
            tracing::debug!(state = state.as_str(), "attempt state");
            self.emit(ProgressEvent::StateChanged {
                attempt: self.attempt.id,
                state,
            });
        }
    }

    async fn run(&mut self) -> AssociationResult<Connected> {
        if !self.inner.wifi.interface_available().await {
            return Err(ClassifiedError::NoInterface);
        }

        self.check_permission().await?;

        if self.attempt.credential.is_missing_secret() {
            return Err(ClassifiedError::MissingSecret);
        }

        let max_retries = self.inner.config.max_association_retries;
        loop {
            let failure = match self.cycle().await {
                Ok(network) => {
                    return Ok(Connected {
                        attempt: self.attempt.id,
                        network,
                        retries: self.attempt.association_retry_count,
                    })
                }
                Err(CycleFailure::NotFound) => return Err(ClassifiedError::NetworkNotFound),
                Err(CycleFailure::Adapter(err)) => err,
            };

            let retry = self.attempt.record_cycle_failure(&failure);
            let disposition = self.inner.classifier.classify(&failure);

            if !disposition.is_retryable() {
                return Err(ClassifiedError::Fatal(failure));
            }
            if retry >= max_retries {
                return Err(ClassifiedError::RetriesExhausted(failure));
            }

            let delay = self.inner.backoff.delay(retry);
            tracing::warn!(
                retry,
                delay_ms = delay.as_millis() as u64,
                code = failure.code,
                domain = %failure.domain,
                disposition = disposition.as_str(),
                "association attempt failed, retrying"
            );
            self.emit(ProgressEvent::Retrying {
                attempt: self.attempt.id,
                retry,
                delay,
                cause: failure,
            });
            sleep(delay).await;
        }
    }

    async fn check_permission(&mut self) -> AssociationResult<()> {
        self.transition(AttemptState::CheckingPermission);

        if self.inner.gate.is_authorized() {
            return Ok(());
        }

        let requested = timeout(
            self.inner.config.permission_timeout,
            self.inner.gate.request_authorization(),
        )
        .await;

        let granted = match requested {
            Ok(granted) => granted,
            Err(_) => {
                tracing::warn!("permission request did not resolve in time");
                self.inner.gate.is_authorized()
            }
        };

        if granted {
            return Ok(());
        }

        match self.inner.prompt.choose(&self.attempt.credential).await {
            SettingsChoice::OpenSettings => {
                *self.inner.pending.lock() = Some(self.attempt.credential.clone());
                self.inner.gate.open_settings_panel();
                Err(ClassifiedError::UserDeferred)
            }
            SettingsChoice::Decline => Err(ClassifiedError::PermissionDenied),
        }
    }

    /// One scan followed by one association
    async fn cycle(&mut self) -> Result<NetworkHandle, CycleFailure> {
        let network = self.scan().await?;

        self.transition(AttemptState::Associating);
        tracing::debug!(
            signal = network.signal,
            bssid = network.bssid.as_deref().unwrap_or("-"),
            "associating"
        );

        self.inner
            .wifi
            .associate(&network, self.attempt.credential.secret())
            .await
            .map_err(CycleFailure::Adapter)?;

        Ok(network)
    }

    async fn scan(&mut self) -> Result<NetworkHandle, CycleFailure> {
        self.transition(AttemptState::Scanning);

        let retry = self.attempt.association_retry_count;
        let max_scans = self.inner.config.max_scan_retries;
        let mut scan_attempt = 0;

        loop {
            let err = match self.inner.wifi.scan(self.attempt.credential.ssid()).await {
                Ok(networks) => {
                    tracing::debug!(found = networks.len(), "scan complete");
                    return strongest(networks).ok_or(CycleFailure::NotFound);
                }
                Err(err) => err,
            };

            scan_attempt += 1;
            self.attempt.record_scan_failure(&err);

            let busy = self.inner.classifier.classify(&err) == Disposition::Busy;
            if !busy || scan_attempt >= max_scans {
                return Err(CycleFailure::Adapter(err));
            }

            let delay = self.inner.backoff.scan_delay(scan_attempt, retry);
            tracing::debug!(scan_attempt, delay_ms = delay.as_millis() as u64, "interface busy");
            self.emit(ProgressEvent::ScanRetrying {
                attempt: self.attempt.id,
                scan_attempt,
                delay,
            });
            sleep(delay).await;
        }
    }

    fn finish(&mut self, outcome: &AssociationResult<Connected>) {
        let id = self.attempt.id;
        let ssid = self.attempt.credential.ssid().to_string();

        match outcome {
            Ok(connected) => {
                self.transition(AttemptState::Connected);
                tracing::info!(retries = connected.retries, "connected");
                self.emit(ProgressEvent::Succeeded { attempt: id, ssid });
            }
            Err(ClassifiedError::UserDeferred) => {
                self.transition(AttemptState::Deferred);
                tracing::info!("deferred until permission is granted");
                self.emit(ProgressEvent::Deferred { attempt: id, ssid });
            }
            Err(error) => {
                self.transition(AttemptState::Failed);
                tracing::warn!(kind = error.kind(), %error, "association failed");
                self.emit(ProgressEvent::Failed {
                    attempt: id,
                    ssid,
                    error: error.clone(),
                });
            }
        }
    }
}

/// Handle to an attempt started with
/// [`spawn_connect`](AssociationEngine::spawn_connect)
pub struct AttemptHandle {
    task: JoinHandle<AssociationResult<Connected>>,
    abandoned: Arc<AtomicBool>,
}

impl AttemptHandle {
    /// Wait for the outcome; `None` if the task was cancelled or panicked
    pub async fn outcome(self) -> Option<AssociationResult<Connected>> {
        self.task.await.ok()
    }

    /// Stop reporting this attempt.
    ///
    /// The attempt itself keeps running until it ends; an association call
    /// already handed to the OS is not interrupted.
    pub fn abandon(self) {
        self.abandoned.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Subscription to permission grants; dropping it unsubscribes
pub struct GrantWatcher {
    task: JoinHandle<()>,
}

impl GrantWatcher {
    pub fn stop(self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for GrantWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
