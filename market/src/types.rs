use std::fmt;

use serde::Deserialize;

/// A tradable instrument as configured at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct Instrument {
    /// Feed symbol, e.g. `R_75`.
    pub symbol: String,
    /// Human-facing name used in notifications.
    pub display_name: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.symbol)
    }
}

/// One price observation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub quote: f64,
    /// Server-side epoch seconds, as reported by the feed.
    pub epoch: i64,
    /// Local arrival time in unix milliseconds.
    pub received_at_ms: u64,
}

impl Tick {
    pub fn new(symbol: impl Into<String>, quote: f64, epoch: i64, received_at_ms: u64) -> Self {
        Self {
            symbol: symbol.into(),
            quote,
            epoch,
            received_at_ms,
        }
    }

    /// Final decimal digit of the quote's textual form.
    pub fn last_digit(&self) -> u8 {
        last_digit(self.quote)
    }
}

/// Final decimal digit of `quote` rendered as text.
///
/// Rendering uses the shortest round-trip form, so `1234.50` reads as
/// `1234.5` and yields 5. An integral quote reads as `1234.0` and yields 0.
pub fn last_digit(quote: f64) -> u8 {
    let text = quote.to_string();

    if !text.contains('.') {
        return 0;
    }

    text.bytes()
        .rev()
        .find(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .unwrap_or(0)
}

/// Decoded inbound feed message.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Tick(Tick),
    /// Server acknowledged a subscription.
    Subscribed {
        symbol: Option<String>,
        subscription_id: String,
    },
    /// Server-side error payload, e.g. an invalid symbol.
    Error {
        code: String,
        message: String,
        symbol: Option<String>,
    },
    Pong,
    /// Frame that could not be decoded; carries the reason.
    Malformed(String),
    Unknown(serde_json::Value),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_digit_reads_final_fraction_digit() {
        assert_eq!(last_digit(1234.56), 6);
        assert_eq!(last_digit(0.001), 1);
        assert_eq!(last_digit(98.7), 7);
    }

    #[test]
    fn trailing_zero_is_not_rendered() {
        // "1234.50" parses to the same value as "1234.5"
        let q: f64 = "1234.50".parse().unwrap();
        assert_eq!(last_digit(q), 5);
    }

    #[test]
    fn integral_quote_yields_zero() {
        assert_eq!(last_digit(1000.0), 0);
        assert_eq!(last_digit(7.0), 0);
    }

    #[test]
    fn tick_delegates_to_quote() {
        let t = Tick::new("R_75", 5321.47, 1_700_000_000, 1);
        assert_eq!(t.last_digit(), 7);
    }

    #[test]
    fn instrument_display_includes_symbol() {
        let i = Instrument::new("R_75", "Volatility 75 Index");
        assert_eq!(i.to_string(), "Volatility 75 Index (R_75)");
    }
}
