pub mod telegram;
pub mod types;

pub use telegram::TelegramNotifier;
pub use types::{LinkButton, MessageId, Notifier, NotifyError, ParseMode, SendOptions};
