use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex as StdMutex, Weak,
};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, Duration, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    host::{self, ClientHost},
    presentation::{PromptAction, PromptProps, PromptView, UpdatePresenter, UpdatePrompt},
};

use super::{
    fetcher::VersionFetcher, ReconciliationState, ReconciliationStatus, VersionRecord,
};

// Per-tick logging is noisy at short intervals
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(60_000);
const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("version state accessed outside a mounted VersionProvider")]
    MissingProvider,
}

#[derive(Clone)]
pub struct ProviderOptions {
    pub interval: Duration,
    /// Identity of the running build. Normally produced by the build tool.
    pub current: VersionRecord,
    pub auto_prompt: bool,
    pub prompt_message: Option<String>,
    /// Replaces the default modal when set.
    pub presenter: Option<Arc<dyn UpdatePresenter>>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CHECK_INTERVAL,
            current: VersionRecord::default(),
            auto_prompt: true,
            prompt_message: None,
            presenter: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionSnapshot {
    #[serde(flatten)]
    pub state: ReconciliationState,
    pub status: ReconciliationStatus,
}

impl VersionSnapshot {
    fn of(state: &ReconciliationState) -> Self {
        Self {
            status: state.status(),
            state: state.clone(),
        }
    }
}

struct Shared {
    state: Mutex<ReconciliationState>,
    fetcher: Arc<dyn VersionFetcher>,
    host: Arc<dyn ClientHost>,
    next_seq: AtomicU64,
    cancel_token: CancellationToken,
    snapshot_tx: watch::Sender<VersionSnapshot>,
    auto_prompt: bool,
    prompt_message: Option<String>,
    presenter: Arc<dyn UpdatePresenter>,
}

impl Shared {
    async fn check(&self) {
        if self.cancel_token.is_cancelled() {
            return;
        }

        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut state = self.state.lock().await;
            state.begin_fetch();
            self.publish(&state);
        }

        let outcome = self.fetcher.fetch_latest().await;

        // Torn down while the request was in flight: nothing left to update.
        if self.cancel_token.is_cancelled() {
            log_debug!("discarding version check #{seq} after unmount");
            return;
        }

        let mut state = self.state.lock().await;
        let now = Utc::now();
        let applied = match outcome {
            Ok(latest) => {
                let build_id = latest.build_id.clone();
                let applied = state.apply_success(seq, latest, now);
                if applied && state.update_available {
                    log_info!(
                        "new build {} available (running {})",
                        build_id,
                        state.current.build_id
                    );
                }
                applied
            }
            Err(err) => {
                log_warn!("version check #{seq} failed: {err}");
                state.apply_failure(seq, now)
            }
        };

        if !applied {
            log_debug!("version check #{seq} superseded by a newer check");
        }
        self.publish(&state);
    }

    fn publish(&self, state: &ReconciliationState) {
        self.snapshot_tx.send_replace(VersionSnapshot::of(state));
    }

    fn prompt_props(&self, state: &ReconciliationState) -> PromptProps {
        let latest = state.latest.as_ref();
        PromptProps {
            show: self.auto_prompt && state.show_prompt(),
            dismissible: true,
            message: self.prompt_message.clone(),
            commit_author: latest.and_then(|l| l.commit_author.clone()),
            commit_message: latest.and_then(|l| l.commit_message.clone()),
            build_id: latest.map(|l| l.build_id.clone()),
        }
    }
}

/// Owns one reconciliation session: the state, the polling task and the
/// action entry points. Unmounting (or dropping) stops the polling task.
pub struct VersionProvider {
    shared: Arc<Shared>,
    ticker: StdMutex<Option<JoinHandle<()>>>,
}

impl VersionProvider {
    /// Starts polling right away; the first check does not wait for the
    /// interval. Must be called from within a tokio runtime.
    pub fn mount(
        options: ProviderOptions,
        fetcher: Arc<dyn VersionFetcher>,
        host: Arc<dyn ClientHost>,
    ) -> Self {
        let initial = ReconciliationState::new(options.current);
        let (snapshot_tx, _) = watch::channel(VersionSnapshot::of(&initial));

        let shared = Arc::new(Shared {
            state: Mutex::new(initial),
            fetcher,
            host,
            next_seq: AtomicU64::new(0),
            cancel_token: CancellationToken::new(),
            snapshot_tx,
            auto_prompt: options.auto_prompt,
            prompt_message: options.prompt_message,
            presenter: options
                .presenter
                .unwrap_or_else(|| Arc::new(UpdatePrompt)),
        });

        let period = options.interval.max(MIN_CHECK_INTERVAL);
        let handle = tokio::spawn(poll_loop(Arc::clone(&shared), period));
        log_info!("version watcher mounted, checking every {}ms", period.as_millis());

        Self {
            shared,
            ticker: StdMutex::new(Some(handle)),
        }
    }

    pub fn handle(&self) -> VersionHandle {
        VersionHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn is_mounted(&self) -> bool {
        !self.shared.cancel_token.is_cancelled()
    }

    /// Stops polling. Safe to call any number of times.
    pub fn unmount(&self) {
        self.shared.cancel_token.cancel();

        let mut guard = match self.ticker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            handle.abort();
            log_info!("version watcher unmounted");
        }
    }
}

impl Drop for VersionProvider {
    fn drop(&mut self) {
        self.unmount();
    }
}

async fn poll_loop(shared: Arc<Shared>, period: Duration) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => shared.check().await,
            _ = shared.cancel_token.cancelled() => break,
        }
    }
}

/// Read access plus the action surface of a mounted [`VersionProvider`].
///
/// Every method fails with [`VersionError::MissingProvider`] once the provider
/// is unmounted or dropped.
#[derive(Clone)]
pub struct VersionHandle {
    shared: Weak<Shared>,
}

impl VersionHandle {
    fn shared(&self) -> Result<Arc<Shared>, VersionError> {
        match self.shared.upgrade() {
            Some(shared) if !shared.cancel_token.is_cancelled() => Ok(shared),
            _ => {
                log_error!("{}", VersionError::MissingProvider);
                Err(VersionError::MissingProvider)
            }
        }
    }

    pub async fn snapshot(&self) -> Result<VersionSnapshot, VersionError> {
        let shared = self.shared()?;
        let state = shared.state.lock().await;
        Ok(VersionSnapshot::of(&state))
    }

    pub async fn current(&self) -> Result<VersionRecord, VersionError> {
        Ok(self.snapshot().await?.state.current)
    }

    pub async fn latest(&self) -> Result<Option<VersionRecord>, VersionError> {
        Ok(self.snapshot().await?.state.latest)
    }

    pub async fn update_available(&self) -> Result<bool, VersionError> {
        Ok(self.snapshot().await?.state.update_available)
    }

    /// Same effect as a timer tick. Leaves the polling schedule alone.
    pub async fn check_now(&self) -> Result<(), VersionError> {
        let shared = self.shared()?;
        shared.check().await;
        Ok(())
    }

    pub async fn dismiss(&self) -> Result<(), VersionError> {
        let shared = self.shared()?;
        let mut state = shared.state.lock().await;
        if state.dismiss() {
            log_info!("update prompt dismissed");
            shared.publish(&state);
        }
        Ok(())
    }

    pub fn reload(&self) -> Result<(), VersionError> {
        let shared = self.shared()?;
        shared.host.reload();
        Ok(())
    }

    pub fn hard_reload(&self) -> Result<(), VersionError> {
        let shared = self.shared()?;
        host::hard_reload(shared.host.as_ref());
        Ok(())
    }

    /// Relays a prompt button press.
    pub async fn press(&self, action: PromptAction) -> Result<(), VersionError> {
        match action {
            PromptAction::Reload => self.reload(),
            PromptAction::HardReload => self.hard_reload(),
            PromptAction::Dismiss => self.dismiss().await,
        }
    }

    /// Renders the configured presenter for the current state. `None` while
    /// there is nothing to show or auto prompting is off.
    pub async fn prompt(&self) -> Result<Option<PromptView>, VersionError> {
        let shared = self.shared()?;
        let props = {
            let state = shared.state.lock().await;
            shared.prompt_props(&state)
        };
        Ok(shared.presenter.render(&props))
    }

    pub fn subscribe(&self) -> Result<watch::Receiver<VersionSnapshot>, VersionError> {
        Ok(self.shared()?.snapshot_tx.subscribe())
    }
}
