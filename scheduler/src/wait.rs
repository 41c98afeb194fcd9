use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Sleep for `d`. Returns `false` if cancelled first.
pub(crate) async fn sleep_or_cancel(d: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(d) => true,
    }
}

/// Sleep until `deadline`. Returns `false` if cancelled first.
pub(crate) async fn sleep_until_or_cancel(deadline: Instant, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep_until(deadline) => true,
    }
}
