use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

use market::feed::QuoteFeed;
use market::types::FeedEvent;

/// Replays a fixed script of events, then either ends or waits for cancel.
#[derive(Clone, Default)]
pub struct ScriptedFeed {
    pub events: Vec<FeedEvent>,
    pub hold_open: bool,
    pub fail_after: bool,
}

impl ScriptedFeed {
    pub fn new(events: Vec<FeedEvent>) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }
}

#[async_trait]
impl QuoteFeed for ScriptedFeed {
    async fn stream_ticks(
        &self,
        _symbols: Vec<String>,
        sender: Sender<FeedEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<()> {
        for ev in self.events.clone() {
            if sender.send(ev).await.is_err() {
                return Ok(());
            }
        }

        if self.fail_after {
            anyhow::bail!("scripted disconnect");
        }

        if self.hold_open {
            cancel.cancelled().await;
        }

        Ok(())
    }
}
