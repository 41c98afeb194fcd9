//! The cycle driver.
//!
//! Every `cycle_interval` (start-to-start) it:
//!   1. Snapshots every instrument buffer.
//!   2. Uses `selector` to pick at most one candidate.
//!   3. Hands the candidate to the `NotificationSequencer`.
//!
//! Cycles never overlap: if a sequence outlasts the interval the next
//! cycle starts as soon as it finishes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, field, info, warn};

use common::logger::{TraceId, root_span};
use market::registry::TickRegistry;
use notifier::Notifier;

use super::selector::select_candidate;
use super::sequencer::{CycleReport, NotificationSequencer};
use super::types::SelectorConfig;
use super::wait::sleep_until_or_cancel;

pub struct CycleDriver<N: Notifier> {
    registry: Arc<TickRegistry>,
    selector: SelectorConfig,
    sequencer: NotificationSequencer<N>,
    interval: Duration,
    cycle: u64,
}

impl<N: Notifier> CycleDriver<N> {
    pub fn new(
        registry: Arc<TickRegistry>,
        selector: SelectorConfig,
        sequencer: NotificationSequencer<N>,
    ) -> Self {
        let interval = sequencer.config().cycle_interval;
        Self {
            registry,
            selector,
            sequencer,
            interval,
            cycle: 0,
        }
    }

    pub fn sequencer(&self) -> &NotificationSequencer<N> {
        &self.sequencer
    }

    /// Number of cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Run cycles back to back until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            instruments = self.registry.symbols().len(),
            "cycle driver started"
        );

        loop {
            let started = Instant::now();
            let report = self.run_cycle(&cancel).await;

            if report.cancelled || cancel.is_cancelled() {
                break;
            }

            let Some(next_start) = started.checked_add(self.interval) else {
                warn!(
                    interval_secs = self.interval.as_secs(),
                    "next cycle start is out of range, waiting for shutdown"
                );
                cancel.cancelled().await;
                break;
            };

            if !sleep_until_or_cancel(next_start, &cancel).await {
                break;
            }
        }

        info!(cycles = self.cycle, "cycle driver stopped");
    }

    /// One selection plus, if something qualified, one notification sequence.
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        self.cycle += 1;
        let trace_id = TraceId::default();
        let span = root_span("signal_cycle", &trace_id, self.cycle);

        async {
            let started_at = Utc::now();
            let snapshots = self.registry.snapshot_all();

            let Some(candidate) = select_candidate(&snapshots, &self.selector, started_at) else {
                info!(instruments = snapshots.len(), "no instrument qualified this cycle");
                return CycleReport::default();
            };

            Span::current().record("candidate", field::display(&candidate.instrument.symbol));
            info!(
                instrument = %candidate.instrument,
                label = %candidate.label,
                confidence = candidate.confidence,
                digit = candidate.digit,
                "candidate selected"
            );

            let report = self.sequencer.run(&candidate, started_at, cancel).await;

            info!(
                sends = report.sends_attempted,
                sends_failed = report.sends_failed,
                deletes = report.deletes_attempted,
                deletes_failed = report.deletes_failed,
                cancelled = report.cancelled,
                "cycle finished"
            );
            report
        }
        .instrument(span)
        .await
    }
}
