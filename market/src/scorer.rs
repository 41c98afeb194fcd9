//! Digit Scorer
//!
//! Scores one instrument's recent tick history for the two "Under" digit
//! contracts and reports which one looks stronger.
//!
//! ## Inputs
//! The last decimal digit (0-9) of every buffered quote, oldest first.
//!
//! ## Definition
//!
//! ```text
//! N             = number of digits
//! under6        = count(d < 6) over all digits
//! under8        = count(d < 8) over all digits
//! streak6       = fraction(d < 6) over the last `streak_window` digits
//! streak8       = fraction(d < 8) over the last `streak_window` digits
//! vol           = population std-dev over the last `vol_window` digits (0 => 1)
//!
//! score_under6  = (under6/N + streak6 * 0.4) / (1 + vol/10)
//! score_under8  = (under8/N) * 0.5 + streak8 * 0.3 + (1/vol) * 0.2
//! ```
//!
//! The higher score wins. An exact tie goes to `Under 6`.
//!
//! ## Warm-up guard
//! No result is produced unless the history is longer than `min_history`.
//!
//! ## Confidence
//! The winning score is an unbounded positive real. It is only meaningful
//! relative to other instruments' scores in the same cycle.
//!
//! This module is pure: identical digits always give bit-identical output.

use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContractLabel {
    Under6,
    Under8,
}

impl ContractLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractLabel::Under6 => "Under 6",
            ContractLabel::Under8 => "Under 8",
        }
    }
}

impl fmt::Display for ContractLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoreResult {
    pub label: ContractLabel,
    pub confidence: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScorerConfig {
    /// History must be strictly longer than this.
    pub min_history: usize,
    pub streak_window: usize,
    pub vol_window: usize,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            min_history: 30,
            streak_window: 5,
            vol_window: 20,
        }
    }
}

/// Intermediate counts, exposed for diagnostics and tests.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DigitStats {
    pub total: usize,
    pub under6_count: usize,
    pub under8_count: usize,
    pub streak_under6: f64,
    pub streak_under8: f64,
    /// Population std-dev of the volatility window, never 0.
    pub vol: f64,
}

impl DigitStats {
    /// `None` for an empty slice.
    pub fn from_digits(digits: &[u8], cfg: &ScorerConfig) -> Option<Self> {
        if digits.is_empty() {
            return None;
        }

        let streak = tail(digits, cfg.streak_window);
        let vol = match population_std(tail(digits, cfg.vol_window)) {
            v if v == 0.0 => 1.0,
            v => v,
        };

        Some(Self {
            total: digits.len(),
            under6_count: count_below(digits, 6),
            under8_count: count_below(digits, 8),
            streak_under6: fraction_below(streak, 6),
            streak_under8: fraction_below(streak, 8),
            vol,
        })
    }

    pub fn score_under6(&self) -> f64 {
        let n = self.total as f64;
        (self.under6_count as f64 / n + self.streak_under6 * 0.4) / (1.0 + self.vol / 10.0)
    }

    pub fn score_under8(&self) -> f64 {
        let n = self.total as f64;
        (self.under8_count as f64 / n) * 0.5 + self.streak_under8 * 0.3 + (1.0 / self.vol) * 0.2
    }
}

/// Score a digit history. `None` means "not enough history, skip".
pub fn score_digits(digits: &[u8], cfg: &ScorerConfig) -> Option<ScoreResult> {
    if digits.len() <= cfg.min_history {
        return None;
    }

    let stats = DigitStats::from_digits(digits, cfg)?;
    Some(pick_label(stats.score_under6(), stats.score_under8()))
}

/// Higher score wins; `Under 6` takes exact ties.
pub fn pick_label(score_under6: f64, score_under8: f64) -> ScoreResult {
    if score_under8 > score_under6 {
        ScoreResult {
            label: ContractLabel::Under8,
            confidence: score_under8,
        }
    } else {
        ScoreResult {
            label: ContractLabel::Under6,
            confidence: score_under6,
        }
    }
}

fn tail(digits: &[u8], window: usize) -> &[u8] {
    &digits[digits.len().saturating_sub(window)..]
}

fn count_below(digits: &[u8], bound: u8) -> usize {
    digits.iter().filter(|&&d| d < bound).count()
}

fn fraction_below(digits: &[u8], bound: u8) -> f64 {
    if digits.is_empty() {
        return 0.0;
    }
    count_below(digits, bound) as f64 / digits.len() as f64
}

fn population_std(digits: &[u8]) -> f64 {
    if digits.is_empty() {
        return 0.0;
    }

    let n = digits.len() as f64;
    let mean = digits.iter().map(|&d| d as f64).sum::<f64>() / n;
    let var = digits
        .iter()
        .map(|&d| {
            let diff = d as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;

    var.sqrt()
}
