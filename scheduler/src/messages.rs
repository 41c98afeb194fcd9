//! Text of every notification the bot posts. HTML parse mode throughout.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;

use super::types::{Candidate, RunMode, SequencerConfig};

const CLOCK_FORMAT: &str = "%H:%M:%S %Z";

/// Wall-clock rendering in the configured zone, e.g. `14:05:09 WAT`.
pub fn clock(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format(CLOCK_FORMAT).to_string()
}

/// `start + interval` as a calendar timestamp.
pub fn next_cycle_at(cycle_started_at: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let millis = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
    TimeDelta::try_milliseconds(millis)
        .and_then(|step| cycle_started_at.checked_add_signed(step))
        .unwrap_or(cycle_started_at)
}

/// "2 minutes", "1 minute", "90 seconds".
pub fn human_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match (secs / 60, secs % 60) {
        (1, 0) => "1 minute".into(),
        (m, 0) if m > 0 => format!("{m} minutes"),
        _ if secs == 1 => "1 second".into(),
        _ => format!("{secs} seconds"),
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn header(title: &str, strategy: &str, mode: RunMode) -> String {
    format!(
        "<b>{title}</b>\n<i>{} · {}</i>",
        escape_html(strategy),
        mode.to_string().to_uppercase()
    )
}

pub fn signal_text(candidate: &Candidate, sent_at: DateTime<Utc>, cfg: &SequencerConfig) -> String {
    format!(
        "🚀 {}\n\n\
         📈 Market: <b>{}</b>\n\
         🎯 Contract: <b>{}</b>\n\
         🔢 Last digit: <b>{}</b>\n\
         ⏳ Valid for: {}\n\
         🕒 Sent at: {}",
        header("NEW SIGNAL", &cfg.strategy_name, cfg.mode),
        escape_html(&candidate.instrument.display_name),
        candidate.label,
        candidate.digit,
        human_duration(cfg.signal_validity),
        clock(sent_at, cfg.display_tz),
    )
}

pub fn expiration_text(
    confidence: f64,
    next_cycle_at: DateTime<Utc>,
    cfg: &SequencerConfig,
) -> String {
    format!(
        "⌛ <b>SIGNAL EXPIRED</b>\n\n\
         📊 Confidence: <b>{confidence:.4}</b>\n\
         ⏭ Next signal at: {}",
        clock(next_cycle_at, cfg.display_tz),
    )
}

pub fn preparation_text(
    next_cycle_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cfg: &SequencerConfig,
) -> String {
    format!(
        "🔔 <b>GET READY</b>\n\n\
         Next signal at: {}\n\
         Current time: {}",
        clock(next_cycle_at, cfg.display_tz),
        clock(now, cfg.display_tz),
    )
}

/// One-off announcement posted at process start. Never tracked.
pub fn startup_text(mode: RunMode, strategy_name: &str) -> String {
    format!("Trading bot started. Mode={mode}. Strategy={strategy_name}.")
}
