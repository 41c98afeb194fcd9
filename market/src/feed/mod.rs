pub mod backoff;
pub mod parser;
pub mod ws;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

use crate::types::FeedEvent;

/// High-level abstraction over a streaming quote source.
///
/// Implementations subscribe to every symbol, forward decoded events into
/// `sender` and keep doing so across reconnects. They return once `cancel`
/// fires or the receiving side has gone away.
#[async_trait]
pub trait QuoteFeed: Send + Sync + 'static {
    async fn stream_ticks(
        &self,
        symbols: Vec<String>,
        sender: Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()>;
}
