//! StreamIngester
//!
//! Keeps the tick buffers fed from the live quote stream.
//! Responsibilities:
//!   • Spawn the feed task that owns the long-lived connection
//!   • Route every incoming tick to its instrument's buffer
//!   • Drop and log malformed frames and unexpected symbols
//!   • Count what it saw so the stream's end can be summarized
//!
//! StreamIngester is an Arc-managed async service, so the feed task and
//! the processing loop can both hold it without lifetime issues.

use std::sync::Arc;

use tokio::sync::mpsc::{self, Receiver};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::IngestError;
use crate::feed::QuoteFeed;
use crate::registry::TickRegistry;
use crate::types::FeedEvent;

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// What happened to a single feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Stored,
    UnknownSymbol,
    Malformed,
    FeedError,
    Ignored,
}

/// Running counters for one ingestion lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub ticks: u64,
    pub unknown_symbols: u64,
    pub malformed: u64,
    pub feed_errors: u64,
}

impl IngestStats {
    fn record(&mut self, outcome: Dispatch) {
        match outcome {
            Dispatch::Stored => self.ticks += 1,
            Dispatch::UnknownSymbol => self.unknown_symbols += 1,
            Dispatch::Malformed => self.malformed += 1,
            Dispatch::FeedError => self.feed_errors += 1,
            Dispatch::Ignored => {}
        }
    }
}

pub struct StreamIngester<F> {
    /// Per-instrument buffers, shared with the cycle driver
    pub registry: Arc<TickRegistry>,

    /// Inbound transport implementation
    pub feed: Arc<F>,

    channel_capacity: usize,
}

impl<F: QuoteFeed> StreamIngester<F> {
    pub fn new(feed: Arc<F>, registry: Arc<TickRegistry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            feed,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        })
    }

    /// Start the feed and process its events until it stops.
    ///
    /// Returns the feed's own error if it gave up; a cancelled or
    /// exhausted stream returns the collected stats.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> anyhow::Result<IngestStats> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        let feed = Arc::clone(&self.feed);
        let symbols = self.registry.symbols();
        info!(symbols = ?symbols, "starting tick ingestion");

        let feed_task = tokio::spawn(async move { feed.stream_ticks(symbols, tx, cancel).await });

        let stats = self.process_event_stream(rx).await;

        info!(
            ticks = stats.ticks,
            unknown_symbols = stats.unknown_symbols,
            malformed = stats.malformed,
            feed_errors = stats.feed_errors,
            "tick stream ended"
        );

        match feed_task.await {
            Ok(Ok(())) => Ok(stats),
            Ok(Err(e)) => {
                error!(error = %e, "tick feed stopped delivering");
                Err(e)
            }
            Err(e) => Err(anyhow::anyhow!("tick feed task failed: {e}")),
        }
    }

    /// Drain `event_rx` until every sender is gone.
    pub async fn process_event_stream(&self, mut event_rx: Receiver<FeedEvent>) -> IngestStats {
        let mut stats = IngestStats::default();

        while let Some(event) = event_rx.recv().await {
            stats.record(self.dispatch(event));
        }

        stats
    }

    /// Route one event. Never fails; problems are logged and counted.
    pub fn dispatch(&self, event: FeedEvent) -> Dispatch {
        match event {
            FeedEvent::Tick(tick) => match self.registry.push(tick) {
                Ok(_) => Dispatch::Stored,
                Err(IngestError::UnknownSymbol(symbol)) => {
                    warn!(symbol = %symbol, "unexpected symbol, tick dropped");
                    Dispatch::UnknownSymbol
                }
            },
            FeedEvent::Malformed(reason) => {
                warn!(reason = %reason, "malformed feed event dropped");
                Dispatch::Malformed
            }
            FeedEvent::Error {
                code,
                message,
                symbol,
            } => {
                warn!(code = %code, message = %message, symbol = ?symbol, "feed reported an error");
                Dispatch::FeedError
            }
            FeedEvent::Subscribed {
                symbol,
                subscription_id,
            } => {
                info!(symbol = ?symbol, subscription_id = %subscription_id, "subscription confirmed");
                Dispatch::Ignored
            }
            FeedEvent::Pong => Dispatch::Ignored,
            FeedEvent::Unknown(value) => {
                debug!(event = %value, "unknown feed event");
                Dispatch::Ignored
            }
        }
    }
}
