//! Candidate selection: score every sufficiently long buffer and keep
//! the single best opportunity of the cycle.

use chrono::{DateTime, Utc};
use tracing::debug;

use market::registry::InstrumentSnapshot;
use market::scorer::score_digits;
use market::types::Tick;

use super::types::{Candidate, SelectorConfig};

/// Pick the highest-confidence candidate across `snapshots`.
///
/// Constraints enforced:
///   - buffers with `cfg.min_ticks` ticks or fewer are skipped outright
///   - the scorer's own warm-up guard applies on top of that
///   - on equal confidence the earlier snapshot (configured order) wins
///
/// Returns `None` when nothing qualifies.
pub fn select_candidate(
    snapshots: &[InstrumentSnapshot],
    cfg: &SelectorConfig,
    now: DateTime<Utc>,
) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;

    for snap in snapshots {
        let symbol = snap.instrument.symbol.as_str();

        if snap.ticks.len() <= cfg.min_ticks {
            debug!(symbol, ticks = snap.ticks.len(), "not enough ticks, skipped");
            continue;
        }

        let digits: Vec<u8> = snap.ticks.iter().map(Tick::last_digit).collect();

        let Some(score) = score_digits(&digits, &cfg.scorer) else {
            debug!(symbol, ticks = digits.len(), "history too short to score");
            continue;
        };

        debug!(
            symbol,
            label = %score.label,
            confidence = score.confidence,
            "instrument scored"
        );

        // strictly greater: ties keep the earlier instrument
        let better = best
            .as_ref()
            .is_none_or(|current| score.confidence > current.confidence);

        if better {
            best = Some(Candidate {
                instrument: snap.instrument.clone(),
                label: score.label,
                confidence: score.confidence,
                digit: digits.last().copied().unwrap_or_default(),
                computed_at: now,
            });
        }
    }

    best
}
