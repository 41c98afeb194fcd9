//! Common types and the transport abstraction used to publish notifications.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-assigned identifier of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the transport should interpret markup in the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    #[default]
    Html,
    MarkdownV2,
    Plain,
}

impl ParseMode {
    pub fn as_wire(&self) -> Option<&'static str> {
        match self {
            ParseMode::Html => Some("HTML"),
            ParseMode::MarkdownV2 => Some("MarkdownV2"),
            ParseMode::Plain => None,
        }
    }
}

/// A single call-to-action attached under a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    pub parse_mode: ParseMode,
    pub link: Option<LinkButton>,
    pub disable_preview: bool,
}

impl SendOptions {
    pub fn html() -> Self {
        Self {
            parse_mode: ParseMode::Html,
            link: None,
            disable_preview: true,
        }
    }

    pub fn with_link(mut self, link: Option<LinkButton>) -> Self {
        self.link = link;
        self
    }
}

/// Errors that can occur while talking to the notification transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Network failure, timeout or non-JSON body. Never carries the request URL.
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    /// The transport answered but refused the request.
    #[error("api error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    #[error("response had no result")]
    MissingResult,
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        // the request URL embeds the bot token
        NotifyError::Http(e.without_url())
    }
}

/// Abstraction over the outbound chat transport.
///
/// Delivery is best-effort: callers log failures and carry on. Each call
/// is bounded by the implementation's own timeout.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `destination`, returning the new message's id.
    async fn send(
        &self,
        destination: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<MessageId, NotifyError>;

    /// Remove a previously posted message.
    async fn delete(&self, destination: &str, message_id: MessageId) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mode_wire_names() {
        assert_eq!(ParseMode::Html.as_wire(), Some("HTML"));
        assert_eq!(ParseMode::MarkdownV2.as_wire(), Some("MarkdownV2"));
        assert_eq!(ParseMode::Plain.as_wire(), None);
    }

    #[test]
    fn api_error_message_is_readable() {
        let e = NotifyError::Api {
            code: Some(400),
            description: "Bad Request: message to delete not found".into(),
        };
        assert_eq!(
            e.to_string(),
            "api error Some(400): Bad Request: message to delete not found"
        );
    }

    #[test]
    fn message_id_is_transparent_json() {
        let id: MessageId = serde_json::from_str("77").unwrap();
        assert_eq!(id, MessageId(77));
        assert_eq!(id.to_string(), "77");
    }
}
