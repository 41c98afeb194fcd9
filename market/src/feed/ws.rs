use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc::Sender;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use common::time::now_ms;

use super::QuoteFeed;
use super::backoff::ExponentialBackoff;
use super::parser::{parse_feed_event, ping_request, subscribe_request};
use crate::error::FeedError;
use crate::types::FeedEvent;

pub const DEFAULT_WS_URL: &str = "wss://ws.derivws.com/websockets/v3?app_id=1089";

const KEEPALIVE_EVERY: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Why a single connection ended without a transport error.
#[derive(Debug)]
enum SessionEnd {
    Cancelled,
    ReceiverGone,
}

/// Client for the Deriv-style tick websocket.
///
/// This client:
/// - opens one connection and sends a `ticks` subscription per symbol
/// - forwards every decoded frame into an mpsc channel
/// - sends a `ping` request every keep-alive period so idle connections stay open
/// - treats two keep-alive periods without any inbound frame as a dead link
/// - reconnects with exponential backoff whenever the connection drops
pub struct DerivWsClient {
    pub ws_url: String,
    backoff: ExponentialBackoff,
    keepalive: Duration,
    connect_timeout: Duration,
}

impl DerivWsClient {
    pub fn new(ws_url: String) -> Self {
        Self {
            ws_url,
            backoff: ExponentialBackoff::default(),
            keepalive: KEEPALIVE_EVERY,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_backoff(mut self, backoff: ExponentialBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Ping period. The read-idle deadline is twice this.
    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Upper bound on TCP connect plus websocket handshake.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn idle_timeout(&self) -> Duration {
        self.keepalive.saturating_mul(2)
    }

    async fn send_subscriptions(
        write: &mut (impl futures::Sink<Message, Error = tungstenite::Error> + Unpin),
        symbols: &[String],
    ) -> Result<(), FeedError> {
        for symbol in symbols {
            write
                .send(Message::Text(subscribe_request(symbol).into()))
                .await?;
            debug!(symbol = %symbol, "tick subscription sent");
        }
        Ok(())
    }

    /// Best-effort close frame; a stalled socket does not hold up shutdown.
    async fn close_quietly(
        write: &mut (impl futures::Sink<Message, Error = tungstenite::Error> + Unpin),
    ) {
        let _ = tokio::time::timeout(CLOSE_GRACE, write.send(Message::Close(None))).await;
    }

    /// One connection lifetime: connect, subscribe, pump frames.
    ///
    /// `attempt` is reset once subscriptions are on the wire. Every await
    /// in here is raced against `cancel`.
    async fn run_session(
        &self,
        symbols: &[String],
        sender: &Sender<FeedEvent>,
        cancel: &CancellationToken,
        attempt: &mut usize,
    ) -> Result<SessionEnd, FeedError> {
        let connect = tokio::time::timeout(self.connect_timeout, connect_async(self.ws_url.as_str()));
        let (ws, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            res = connect => res.map_err(|_| {
                FeedError::Disconnected(format!(
                    "handshake timed out after {}ms",
                    self.connect_timeout.as_millis()
                ))
            })??,
        };
        let (mut write, mut read) = ws.split();

        tokio::select! {
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            res = Self::send_subscriptions(&mut write, symbols) => res?,
        }
        *attempt = 0;
        info!(url = %self.ws_url, symbols = symbols.len(), "tick feed subscribed");

        let mut keepalive = tokio::time::interval(self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately
        keepalive.tick().await;

        let idle_timeout = self.idle_timeout();
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    Self::close_quietly(&mut write).await;
                    return Ok(SessionEnd::Cancelled);
                }
                _ = &mut idle => {
                    return Err(FeedError::Disconnected(format!(
                        "idle timeout: no frame for {}ms",
                        idle_timeout.as_millis()
                    )));
                }
                _ = keepalive.tick() => {
                    let ping = write.send(Message::Text(ping_request().into()));
                    match tokio::time::timeout(self.keepalive, ping).await {
                        Ok(res) => res?,
                        Err(_) => return Err(FeedError::Disconnected("keep-alive write stalled".into())),
                    }
                }
                frame = read.next() => {
                    let msg = match frame {
                        Some(Ok(m)) => m,
                        Some(Err(e)) => return Err(FeedError::Transport(e)),
                        None => return Err(FeedError::Disconnected("stream ended".into())),
                    };
                    idle.as_mut().reset(Instant::now() + idle_timeout);

                    let event = match msg {
                        Message::Text(text) => match parse_feed_event(text.as_str(), now_ms()) {
                            Ok(Some(event)) => event,
                            Ok(None) => continue,
                            Err(e) => FeedEvent::Malformed(e.to_string()),
                        },
                        Message::Close(frame) => {
                            let reason = frame
                                .map(|f| f.reason.as_str().to_string())
                                .unwrap_or_else(|| "no reason".into());
                            return Err(FeedError::Disconnected(format!("closed by server: {reason}")));
                        }
                        // ping/pong frames are answered by tungstenite
                        _ => continue,
                    };

                    tokio::select! {
                        _ = cancel.cancelled() => {
                            Self::close_quietly(&mut write).await;
                            return Ok(SessionEnd::Cancelled);
                        }
                        res = sender.send(event) => {
                            if res.is_err() {
                                return Ok(SessionEnd::ReceiverGone);
                            }
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl QuoteFeed for DerivWsClient {
    /// Main websocket loop. Never gives up unless the backoff is bounded.
    async fn stream_ticks(
        &self,
        symbols: Vec<String>,
        sender: Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        let mut attempt = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            info!(url = %self.ws_url, attempt, "connecting to tick feed");

            match self.run_session(&symbols, &sender, &cancel, &mut attempt).await {
                Ok(SessionEnd::Cancelled) => {
                    info!("tick feed cancelled");
                    return Ok(());
                }
                Ok(SessionEnd::ReceiverGone) => {
                    info!("tick receiver dropped, closing feed");
                    return Ok(());
                }
                Err(e) => warn!(error = %e, attempt, "tick feed disconnected"),
            }

            let Some(delay) = self.backoff.next_delay(attempt) else {
                error!(attempt, "tick feed reconnect attempts exhausted");
                anyhow::bail!("tick feed gave up after {attempt} reconnect attempts");
            };
            attempt += 1;

            info!(delay_ms = delay.as_millis() as u64, attempt, "reconnecting to tick feed");

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // Port 9 (discard) on localhost is closed in test environments, so every
    // connect attempt fails fast.
    fn unreachable_client(max_attempts: usize) -> DerivWsClient {
        DerivWsClient::new("ws://127.0.0.1:9".into()).with_backoff(ExponentialBackoff::new(
            Duration::from_millis(1),
            Duration::from_millis(5),
            Some(max_attempts),
        ))
    }

    #[tokio::test]
    async fn bounded_backoff_gives_up() {
        let client = unreachable_client(2);
        let (tx, _rx) = mpsc::channel(4);

        let res = client
            .stream_ticks(vec!["R_10".into()], tx, CancellationToken::new())
            .await;

        assert!(res.is_err());
    }

    #[tokio::test]
    async fn cancelled_before_start_returns_ok() {
        let client = unreachable_client(100);
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let res = client.stream_ticks(vec!["R_10".into()], tx, cancel).await;
        assert!(res.is_ok());
    }

    // -------------------------------------------------------------
    // LIVENESS: stalled handshakes, silent links, full channels
    // -------------------------------------------------------------
    use tokio::net::TcpListener;

    /// Accepts TCP connections and never answers the websocket handshake.
    async fn mute_listener() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        format!("ws://{addr}")
    }

    /// Completes the handshake, then runs `behaviour` on the socket.
    async fn ws_server<F, Fut>(behaviour: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            behaviour(ws).await;
        });
        format!("ws://{addr}")
    }

    #[tokio::test]
    async fn cancel_interrupts_a_stalled_handshake() {
        let url = mute_listener().await;
        let client = DerivWsClient::new(url).with_connect_timeout(Duration::from_secs(60));
        let (tx, _rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let res = tokio::time::timeout(
            Duration::from_secs(5),
            client.stream_ticks(vec!["R_10".into()], tx, cancel),
        )
        .await
        .expect("feed must return promptly after cancel");
        assert!(res.is_ok());
    }

    #[tokio::test]
    async fn stalled_handshake_times_out_as_disconnect() {
        let url = mute_listener().await;
        let client = DerivWsClient::new(url).with_connect_timeout(Duration::from_millis(100));
        let (tx, _rx) = mpsc::channel(4);
        let mut attempt = 3;

        let res = tokio::time::timeout(
            Duration::from_secs(5),
            client.run_session(&["R_10".to_string()], &tx, &CancellationToken::new(), &mut attempt),
        )
        .await
        .expect("handshake timeout must fire");

        match res {
            Err(FeedError::Disconnected(reason)) => assert!(reason.contains("handshake timed out")),
            other => panic!("Expected handshake timeout, got {other:?}"),
        }
        assert_eq!(attempt, 3);
    }

    #[tokio::test]
    async fn stalled_handshake_goes_through_backoff() {
        let url = mute_listener().await;
        let client = DerivWsClient::new(url)
            .with_connect_timeout(Duration::from_millis(50))
            .with_backoff(ExponentialBackoff::new(
                Duration::from_millis(1),
                Duration::from_millis(5),
                Some(2),
            ));
        let (tx, _rx) = mpsc::channel(4);

        let res = tokio::time::timeout(
            Duration::from_secs(5),
            client.stream_ticks(vec!["R_10".into()], tx, CancellationToken::new()),
        )
        .await
        .expect("bounded retries must finish");
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn silent_server_hits_the_idle_deadline() {
        let url = ws_server(|ws| async move {
            // hold the connection open without ever writing
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(ws);
        })
        .await;
        let client = DerivWsClient::new(url).with_keepalive(Duration::from_millis(50));
        let (tx, _rx) = mpsc::channel(4);
        let mut attempt = 2;

        let res = tokio::time::timeout(
            Duration::from_secs(5),
            client.run_session(&["R_10".to_string()], &tx, &CancellationToken::new(), &mut attempt),
        )
        .await
        .expect("idle deadline must fire");

        match res {
            Err(FeedError::Disconnected(reason)) => assert!(reason.contains("idle timeout")),
            other => panic!("Expected idle timeout, got {other:?}"),
        }
        // subscriptions went out before the link died
        assert_eq!(attempt, 0);
    }

    #[tokio::test]
    async fn ticks_are_forwarded_and_full_channel_does_not_block_cancel() {
        let url = ws_server(|mut ws| async move {
            let frame = serde_json::json!({
                "msg_type": "tick",
                "tick": { "symbol": "R_10", "quote": 6421.3, "epoch": 1_700_000_000 }
            })
            .to_string();
            while ws.send(Message::Text(frame.clone().into())).await.is_ok() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        let client = DerivWsClient::new(url);
        let (tx, mut rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();

        let feed = tokio::spawn({
            let cancel = cancel.clone();
            async move { client.stream_ticks(vec!["R_10".into()], tx, cancel).await }
        });

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("a tick should arrive")
            .unwrap();
        assert!(matches!(first, FeedEvent::Tick(t) if t.symbol == "R_10" && t.last_digit() == 3));

        // stop draining: the channel fills and the feed parks on send
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();

        let res = tokio::time::timeout(Duration::from_secs(5), feed)
            .await
            .expect("feed must return promptly after cancel")
            .unwrap();
        assert!(res.is_ok());
        drop(rx);
    }
}
