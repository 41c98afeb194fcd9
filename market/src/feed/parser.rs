//! Feed Event Parser
//!
//! Decodes raw websocket text frames from the tick feed into `FeedEvent`.
//! Every frame is a JSON object tagged by `msg_type`:
//!
//! ```jsonc
//! { "msg_type": "tick",
//!   "subscription": { "id": "a1b2" },
//!   "tick": { "symbol": "R_75", "quote": 5321.47, "epoch": 1700000000, "pip_size": 2 } }
//!
//! { "msg_type": "tick",
//!   "echo_req": { "ticks": "R_XX", "subscribe": 1 },
//!   "error": { "code": "InvalidSymbol", "message": "Symbol R_XX invalid" } }
//!
//! { "msg_type": "ping", "ping": "pong" }
//! ```
//!
//! - an `error` object always wins, whatever the `msg_type`
//! - tick frames carry a `subscription.id`; it is not surfaced, ticks are
//!   decoded as `Tick`. `Subscribed` only comes from explicit `ticks` or
//!   `subscribe` acknowledgements
//! - frames without `msg_type` are ignored (`None`)
//! - invalid JSON or a tick without `symbol`/`quote` is `FeedError::Malformed`
//!
//! The parser is stateless; connection handling lives in `ws`.

use serde::Deserialize;
use serde_json::Value;

use crate::error::FeedError;
use crate::types::{FeedEvent, Tick};

#[derive(Debug, Deserialize)]
struct TickPayload {
    symbol: String,
    quote: f64,
    #[serde(default)]
    epoch: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

pub fn parse_feed_event(raw: &str, received_at_ms: u64) -> Result<Option<FeedEvent>, FeedError> {
    let json: Value = serde_json::from_str(raw)?;

    if let Some(err) = json.get("error") {
        let payload: ErrorPayload = serde_json::from_value(err.clone())?;
        let symbol = json
            .get("echo_req")
            .and_then(|e| e.get("ticks"))
            .and_then(Value::as_str)
            .map(str::to_string);

        return Ok(Some(FeedEvent::Error {
            code: payload.code,
            message: payload.message,
            symbol,
        }));
    }

    let Some(msg_type) = json.get("msg_type").and_then(Value::as_str) else {
        return Ok(None);
    };

    match msg_type {
        "tick" => {
            let Some(raw_tick) = json.get("tick") else {
                return Err(FeedError::Malformed("tick frame without tick body".into()));
            };
            let payload: TickPayload = serde_json::from_value(raw_tick.clone())?;

            Ok(Some(FeedEvent::Tick(Tick::new(
                payload.symbol,
                payload.quote,
                payload.epoch,
                received_at_ms,
            ))))
        }
        "ping" => Ok(Some(FeedEvent::Pong)),
        "ticks" | "subscribe" => {
            let subscription_id = json
                .get("subscription")
                .and_then(|s| s.get("id"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let symbol = json
                .get("echo_req")
                .and_then(|e| e.get("ticks"))
                .and_then(Value::as_str)
                .map(str::to_string);

            Ok(Some(FeedEvent::Subscribed {
                symbol,
                subscription_id,
            }))
        }
        _ => Ok(Some(FeedEvent::Unknown(json))),
    }
}

/// Subscribe request for one symbol.
pub fn subscribe_request(symbol: &str) -> String {
    serde_json::json!({ "ticks": symbol, "subscribe": 1 }).to_string()
}

/// Application-level keep-alive request.
pub fn ping_request() -> String {
    serde_json::json!({ "ping": 1 }).to_string()
}
