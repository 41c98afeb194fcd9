//! Notification sequencer.
//!
//! Drives one cycle's notifications for a chosen candidate:
//!   1. Retract whatever the previous cycle left behind (signal, then
//!      expiration, then preparation). Failures are logged, never fatal.
//!   2. Post the signal and wait out its validity.
//!   3. Post the expiration summary and wait the preparation delay.
//!   4. Post the preparation notice and go back to idle.
//!
//! Every send is best-effort: a failed post leaves its category untracked
//! and the sequence carries on. Cancellation is honoured at every wait.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};

use common::logger::child_span;
use notifier::{Notifier, SendOptions};

use super::messages;
use super::state::{NotificationCategory, NotificationRecord, NotificationRecords, SequencerState};
use super::types::{Candidate, SequencerConfig};
use super::wait::sleep_or_cancel;

/// What one cycle did, for logs and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub sends_attempted: usize,
    pub sends_failed: usize,
    pub deletes_attempted: usize,
    pub deletes_failed: usize,
    pub cancelled: bool,
}

pub struct NotificationSequencer<N: Notifier> {
    notifier: Arc<N>,
    cfg: SequencerConfig,
    records: NotificationRecords,
    state: SequencerState,
}

impl<N: Notifier> NotificationSequencer<N> {
    pub fn new(notifier: Arc<N>, cfg: SequencerConfig) -> Self {
        Self {
            notifier,
            cfg,
            records: NotificationRecords::default(),
            state: SequencerState::Idle,
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.cfg
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn records(&self) -> &NotificationRecords {
        &self.records
    }

    /// Run the full notification sequence for `candidate`.
    ///
    /// `cycle_started_at` anchors the "next signal" time shown to readers.
    pub async fn run(
        &mut self,
        candidate: &Candidate,
        cycle_started_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> CycleReport {
        let mut report = CycleReport::default();
        let next_cycle_at = messages::next_cycle_at(cycle_started_at, self.cfg.cycle_interval);

        self.retract_previous(&mut report)
            .instrument(child_span("retract"))
            .await;

        if cancel.is_cancelled() {
            return self.abort(report);
        }

        // signal
        let now = Utc::now();
        let text = messages::signal_text(candidate, now, &self.cfg);
        let options = SendOptions::html().with_link(self.cfg.link.clone());
        self.post(NotificationCategory::Signal, &text, &options, now, &mut report)
            .instrument(child_span("signal"))
            .await;
        self.transition(SequencerState::SignalSent);

        if !sleep_or_cancel(self.cfg.signal_validity, cancel).await {
            return self.abort(report);
        }

        // expiration
        let now = Utc::now();
        let text = messages::expiration_text(candidate.confidence, next_cycle_at, &self.cfg);
        self.post(NotificationCategory::Expiration, &text, &SendOptions::html(), now, &mut report)
            .instrument(child_span("expiration"))
            .await;
        self.transition(SequencerState::ExpiredSent);

        if !sleep_or_cancel(self.cfg.prep_delay, cancel).await {
            return self.abort(report);
        }

        // preparation
        let now = Utc::now();
        let text = messages::preparation_text(next_cycle_at, now, &self.cfg);
        self.post(NotificationCategory::Preparation, &text, &SendOptions::html(), now, &mut report)
            .instrument(child_span("preparation"))
            .await;
        self.transition(SequencerState::PrepSent);

        self.transition(SequencerState::Idle);
        report
    }

    /// Delete every tracked message. Each identifier gets exactly one
    /// attempt and is forgotten afterwards, whatever the outcome.
    async fn retract_previous(&mut self, report: &mut CycleReport) {
        for record in self.records.drain() {
            report.deletes_attempted += 1;

            match self
                .notifier
                .delete(&self.cfg.destination, record.message_id)
                .await
            {
                Ok(()) => debug!(
                    category = %record.category,
                    message_id = %record.message_id,
                    "previous notification deleted"
                ),
                Err(e) => {
                    report.deletes_failed += 1;
                    warn!(
                        category = %record.category,
                        message_id = %record.message_id,
                        error = %e,
                        "failed to delete previous notification"
                    );
                }
            }
        }
    }

    async fn post(
        &mut self,
        category: NotificationCategory,
        text: &str,
        options: &SendOptions,
        now: DateTime<Utc>,
        report: &mut CycleReport,
    ) {
        report.sends_attempted += 1;

        match self.notifier.send(&self.cfg.destination, text, options).await {
            Ok(message_id) => {
                info!(category = %category, message_id = %message_id, "notification sent");
                let displaced = self.records.replace(NotificationRecord {
                    message_id,
                    category,
                    created_at: now,
                });
                if let Some(old) = displaced {
                    warn!(category = %category, message_id = %old.message_id, "replaced a notification that was never retracted");
                }
            }
            Err(e) => {
                report.sends_failed += 1;
                error!(category = %category, error = %e, "failed to send notification");
            }
        }
    }

    fn transition(&mut self, next: SequencerState) {
        debug!(from = ?self.state, to = ?next, "sequencer state");
        self.state = next;
    }

    fn abort(&mut self, mut report: CycleReport) -> CycleReport {
        info!(state = ?self.state, "notification sequence cancelled");
        report.cancelled = true;
        self.transition(SequencerState::Idle);
        report
    }
}
