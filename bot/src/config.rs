use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use market::feed::ws::DEFAULT_WS_URL;
use market::scorer::ScorerConfig;
use market::types::Instrument;
use notifier::LinkButton;
use notifier::telegram::DEFAULT_API_URL;
use scheduler::{RunMode, SelectorConfig, SequencerConfig};

use crate::error::ConfigError;

const DEFAULT_INSTRUMENTS: &str = "R_10:Volatility 10 Index,\
R_25:Volatility 25 Index,\
R_50:Volatility 50 Index,\
R_75:Volatility 75 Index,\
R_100:Volatility 100 Index,\
1HZ75V:Volatility 75 (1s) Index";

const DEFAULT_LINK_LABEL: &str = "Open trading platform";

/// One week.
const MAX_CYCLE_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Clone)]
pub struct AppConfig {
    /// Bot API credential. Never logged.
    pub telegram_token: String,

    /// Chat that receives every notification.
    pub telegram_chat_id: String,

    pub telegram_api_url: String,
    pub feed_ws_url: String,

    /// Instruments in selection order. Earlier entries win confidence ties.
    pub instruments: Vec<Instrument>,

    /// Ticks kept per instrument; the oldest is evicted first.
    pub buffer_capacity: usize,

    pub selector: SelectorConfig,

    // =========================
    // Notification cadence
    // =========================
    /// Wait between the signal and its expiration summary.
    pub signal_validity: Duration,

    /// Wait between the expiration summary and the preparation notice.
    pub prep_delay: Duration,

    /// Start-to-start distance between cycles. Must cover both waits.
    pub cycle_interval: Duration,

    pub display_tz: Tz,
    pub strategy_name: String,
    pub mode: RunMode,
    pub link: Option<LinkButton>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("telegram_token", &"<redacted>")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_url", &self.telegram_api_url)
            .field("feed_ws_url", &self.feed_ws_url)
            .field("instruments", &self.instruments)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("selector", &self.selector)
            .field("signal_validity", &self.signal_validity)
            .field("prep_delay", &self.prep_delay)
            .field("cycle_interval", &self.cycle_interval)
            .field("display_tz", &self.display_tz)
            .field("strategy_name", &self.strategy_name)
            .field("mode", &self.mode)
            .field("link", &self.link)
            .finish()
    }
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let telegram_token = get("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        let telegram_chat_id =
            get("TELEGRAM_CHAT_ID").ok_or(ConfigError::Missing("TELEGRAM_CHAT_ID"))?;

        let instruments = parse_instruments(
            &get("INSTRUMENTS").unwrap_or_else(|| DEFAULT_INSTRUMENTS.to_string()),
        )?;

        let display_tz = match get("DISPLAY_TZ") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::invalid("DISPLAY_TZ", format!("unknown time zone {raw}")))?,
            None => Tz::UTC,
        };

        let mode = match get("MODE") {
            Some(raw) => raw
                .parse::<RunMode>()
                .map_err(|e| ConfigError::invalid("MODE", e))?,
            None => RunMode::Demo,
        };

        // a label alone does nothing; a URL alone gets the default label
        let link = get("SIGNAL_LINK_URL").map(|url| LinkButton {
            label: get("SIGNAL_LINK_LABEL").unwrap_or_else(|| DEFAULT_LINK_LABEL.to_string()),
            url: url.trim().to_string(),
        });

        let cfg = Self {
            telegram_token,
            telegram_chat_id,
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            feed_ws_url: get("FEED_WS_URL").unwrap_or_else(|| DEFAULT_WS_URL.to_string()),
            instruments,
            buffer_capacity: parse_or(&get, "BUFFER_CAPACITY", 200)?,
            selector: SelectorConfig {
                min_ticks: parse_or(&get, "SELECTOR_MIN_TICKS", 20)?,
                scorer: ScorerConfig {
                    min_history: parse_or(&get, "MIN_HISTORY", 30)?,
                    streak_window: parse_or(&get, "STREAK_WINDOW", 5)?,
                    vol_window: parse_or(&get, "VOL_WINDOW", 20)?,
                },
            },
            signal_validity: Duration::from_secs(parse_or(&get, "SIGNAL_VALID_SECS", 120)?),
            prep_delay: Duration::from_secs(parse_or(&get, "PREP_DELAY_SECS", 60)?),
            cycle_interval: Duration::from_secs(parse_or(&get, "CYCLE_INTERVAL_SECS", 600)?),
            display_tz,
            strategy_name: get("STRATEGY_NAME").unwrap_or_else(|| "SNIPPER HAVOC V2".to_string()),
            mode,
            link,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::invalid("INSTRUMENTS", "no instruments configured"));
        }

        if self.buffer_capacity == 0 {
            return Err(ConfigError::invalid("BUFFER_CAPACITY", "must be greater than 0"));
        }

        let scorer = &self.selector.scorer;
        if scorer.streak_window == 0 || scorer.vol_window == 0 {
            return Err(ConfigError::invalid(
                "STREAK_WINDOW/VOL_WINDOW",
                "windows must be greater than 0",
            ));
        }
        if scorer.min_history < scorer.vol_window || scorer.min_history < scorer.streak_window {
            return Err(ConfigError::invalid(
                "MIN_HISTORY",
                "must be at least as long as both scoring windows",
            ));
        }

        if self.cycle_interval.is_zero() {
            return Err(ConfigError::invalid("CYCLE_INTERVAL_SECS", "must be greater than 0"));
        }
        if self.cycle_interval > MAX_CYCLE_INTERVAL {
            return Err(ConfigError::invalid(
                "CYCLE_INTERVAL_SECS",
                format!("must not exceed {}s", MAX_CYCLE_INTERVAL.as_secs()),
            ));
        }
        let Some(sequence) = self.signal_validity.checked_add(self.prep_delay) else {
            return Err(ConfigError::invalid(
                "SIGNAL_VALID_SECS/PREP_DELAY_SECS",
                "sum is out of range",
            ));
        };
        if sequence > self.cycle_interval {
            return Err(ConfigError::invalid(
                "CYCLE_INTERVAL_SECS",
                "must cover signal validity plus preparation delay",
            ));
        }

        Ok(())
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            destination: self.telegram_chat_id.clone(),
            signal_validity: self.signal_validity,
            prep_delay: self.prep_delay,
            cycle_interval: self.cycle_interval,
            display_tz: self.display_tz,
            strategy_name: self.strategy_name.clone(),
            mode: self.mode,
            link: self.link.clone(),
        }
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(key, format!("{raw:?}: {e}"))),
        None => Ok(default),
    }
}

/// `SYM:Display Name` entries, comma separated. A bare symbol is its own name.
pub fn parse_instruments(raw: &str) -> Result<Vec<Instrument>, ConfigError> {
    let mut out: Vec<Instrument> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (symbol, name) = match entry.split_once(':') {
            Some((s, n)) => (s.trim(), n.trim()),
            None => (entry, entry),
        };

        if symbol.is_empty() {
            return Err(ConfigError::invalid("INSTRUMENTS", format!("empty symbol in {entry:?}")));
        }
        if out.iter().any(|i| i.symbol == symbol) {
            return Err(ConfigError::invalid("INSTRUMENTS", format!("duplicate symbol {symbol}")));
        }

        let name = if name.is_empty() { symbol } else { name };
        out.push(Instrument::new(symbol, name));
    }

    Ok(out)
}
