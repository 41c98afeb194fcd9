use tracing::{info, warn};

use notifier::{MessageId, Notifier, ParseMode, SendOptions};
use scheduler::messages::startup_text;

use crate::config::AppConfig;

/// Post the one-off "bot started" message. Best-effort and never tracked,
/// so it is not retracted by any later cycle.
pub async fn announce_startup<N: Notifier>(notifier: &N, cfg: &AppConfig) -> Option<MessageId> {
    let text = startup_text(cfg.mode, &cfg.strategy_name);
    let options = SendOptions {
        parse_mode: ParseMode::Plain,
        ..SendOptions::default()
    };

    match notifier.send(&cfg.telegram_chat_id, &text, &options).await {
        Ok(id) => {
            info!(message_id = %id, mode = %cfg.mode, "startup announcement sent");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, "startup announcement failed");
            None
        }
    }
}
