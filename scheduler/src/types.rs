//! Shared types used by the scheduler subsystem.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use market::scorer::{ContractLabel, ScorerConfig};
use market::types::Instrument;
use notifier::LinkButton;

/// Knobs for picking the cycle's candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorConfig {
    /// Buffers with this many ticks or fewer are not scored at all.
    pub min_ticks: usize,

    /// History requirements and windows handed to the scorer.
    pub scorer: ScorerConfig,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            min_ticks: 20,
            scorer: ScorerConfig::default(),
        }
    }
}

/// Whether the bot announces itself as a demo or a live deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Demo,
    Live,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunMode::Demo => "demo",
            RunMode::Live => "live",
        };
        f.write_str(s)
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "demo" => Ok(RunMode::Demo),
            "live" => Ok(RunMode::Live),
            other => Err(format!("invalid run mode: {other}")),
        }
    }
}

/// Timing and presentation of the notification sequence.
#[derive(Debug, Clone)]
pub struct SequencerConfig {
    /// Chat that receives every notification.
    pub destination: String,

    /// How long a signal stays valid; wait between signal and expiration.
    pub signal_validity: Duration,

    /// Wait between the expiration summary and the preparation notice.
    pub prep_delay: Duration,

    /// Start-to-start distance between two cycles.
    pub cycle_interval: Duration,

    /// Zone used for every timestamp shown to readers.
    pub display_tz: Tz,

    pub strategy_name: String,
    pub mode: RunMode,

    /// Optional call-to-action attached to signal messages.
    pub link: Option<LinkButton>,
}

impl SequencerConfig {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            signal_validity: Duration::from_secs(120),
            prep_delay: Duration::from_secs(60),
            cycle_interval: Duration::from_secs(600),
            display_tz: Tz::UTC,
            strategy_name: "SNIPPER HAVOC V2".into(),
            mode: RunMode::Demo,
            link: None,
        }
    }
}

/// The single opportunity picked for one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub instrument: Instrument,
    pub label: ContractLabel,
    pub confidence: f64,
    /// Last digit of the instrument's most recent tick.
    pub digit: u8,
    pub computed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_mode_parses_case_insensitively() {
        assert_eq!("LIVE".parse::<RunMode>(), Ok(RunMode::Live));
        assert_eq!(" demo ".parse::<RunMode>(), Ok(RunMode::Demo));
        assert!("paper".parse::<RunMode>().is_err());
    }

    #[test]
    fn sequencer_defaults_match_the_timetable() {
        let cfg = SequencerConfig::new("-100");
        assert_eq!(cfg.signal_validity, Duration::from_secs(120));
        assert_eq!(cfg.prep_delay, Duration::from_secs(60));
        assert_eq!(cfg.cycle_interval, Duration::from_secs(600));
        assert_eq!(cfg.display_tz, Tz::UTC);
    }
}
