use chrono::{DateTime, Utc};
use serde::Serialize;

use super::record::{is_update, VersionRecord};

/// Derived view of the reconciliation state; never stored directly.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ReconciliationStatus {
    NoData,
    UpToDate,
    UpdateAvailable,
    UpdateDismissed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationState {
    pub current: VersionRecord,
    pub latest: Option<VersionRecord>,
    pub update_available: bool,
    pub dismissed: bool,
    pub checking: bool,
    pub last_checked: Option<DateTime<Utc>>,
    /// Request number of the newest fetch whose outcome has been applied.
    #[serde(skip)]
    pub applied_seq: u64,
    #[serde(skip)]
    pub in_flight: u32,
}

impl ReconciliationState {
    pub fn new(current: VersionRecord) -> Self {
        Self {
            current,
            latest: None,
            update_available: false,
            dismissed: false,
            checking: false,
            last_checked: None,
            applied_seq: 0,
            in_flight: 0,
        }
    }

    pub fn status(&self) -> ReconciliationStatus {
        match (&self.latest, self.update_available, self.dismissed) {
            (None, _, _) => ReconciliationStatus::NoData,
            (Some(_), false, _) => ReconciliationStatus::UpToDate,
            (Some(_), true, false) => ReconciliationStatus::UpdateAvailable,
            (Some(_), true, true) => ReconciliationStatus::UpdateDismissed,
        }
    }

    /// Whether an update prompt should currently be visible.
    pub fn show_prompt(&self) -> bool {
        self.update_available && !self.dismissed
    }

    pub fn begin_fetch(&mut self) {
        self.in_flight += 1;
        self.checking = true;
    }

    /// Applies a successful fetch. `dismissed` is left untouched so a poll that
    /// reconfirms an already dismissed update keeps the prompt hidden.
    ///
    /// Returns false when a newer request has already been applied.
    pub fn apply_success(&mut self, seq: u64, latest: VersionRecord, at: DateTime<Utc>) -> bool {
        if !self.finish_fetch(seq, at) {
            return false;
        }
        self.update_available = is_update(&self.current, &latest);
        self.latest = Some(latest);
        true
    }

    /// Applies a failed fetch: no update can be confirmed right now.
    pub fn apply_failure(&mut self, seq: u64, at: DateTime<Utc>) -> bool {
        if !self.finish_fetch(seq, at) {
            return false;
        }
        self.latest = None;
        self.update_available = false;
        true
    }

    /// Marks the user's dismissal. Returns whether anything changed.
    pub fn dismiss(&mut self) -> bool {
        if !self.update_available || self.dismissed {
            return false;
        }
        self.dismissed = true;
        true
    }

    fn finish_fetch(&mut self, seq: u64, at: DateTime<Utc>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.checking = self.in_flight > 0;
        if seq < self.applied_seq {
            return false;
        }
        self.applied_seq = seq;
        self.last_checked = Some(at);
        true
    }
}
