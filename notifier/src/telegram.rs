use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::types::{MessageId, Notifier, NotifyError, SendOptions};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Envelope shared by every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: MessageId,
}

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    /// `{api_url}/bot{token}`; never logged.
    base_url: String,
}

impl TelegramNotifier {
    pub fn new(api_url: &str, token: &str) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &Value) -> Result<T, NotifyError> {
        let url = format!("{}/{}", self.base_url, method);

        // Bot API reports refusals in the JSON body, with a non-2xx status
        let resp = self.http.post(&url).json(body).send().await?;
        let envelope: ApiResponse<T> = resp.json().await?;

        unwrap_response(envelope)
    }
}

fn unwrap_response<T>(envelope: ApiResponse<T>) -> Result<T, NotifyError> {
    if !envelope.ok {
        return Err(NotifyError::Api {
            code: envelope.error_code,
            description: envelope
                .description
                .unwrap_or_else(|| "no description".into()),
        });
    }

    envelope.result.ok_or(NotifyError::MissingResult)
}

/// JSON body for `sendMessage`.
pub fn send_message_body(chat_id: &str, text: &str, options: &SendOptions) -> Value {
    let mut body = json!({
        "chat_id": chat_id,
        "text": text,
        "disable_web_page_preview": options.disable_preview,
    });

    if let Some(mode) = options.parse_mode.as_wire() {
        body["parse_mode"] = json!(mode);
    }

    if let Some(link) = &options.link {
        body["reply_markup"] = json!({
            "inline_keyboard": [[{ "text": link.label, "url": link.url }]]
        });
    }

    body
}

/// JSON body for `deleteMessage`.
pub fn delete_message_body(chat_id: &str, message_id: MessageId) -> Value {
    json!({ "chat_id": chat_id, "message_id": message_id })
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip_all, fields(chat_id = %destination), level = "debug")]
    async fn send(
        &self,
        destination: &str,
        text: &str,
        options: &SendOptions,
    ) -> Result<MessageId, NotifyError> {
        let body = send_message_body(destination, text, options);
        let sent: SentMessage = self.call("sendMessage", &body).await?;

        debug!(message_id = %sent.message_id, "telegram message sent");
        Ok(sent.message_id)
    }

    #[instrument(skip_all, fields(chat_id = %destination, message_id = %message_id), level = "debug")]
    async fn delete(&self, destination: &str, message_id: MessageId) -> Result<(), NotifyError> {
        let body = delete_message_body(destination, message_id);
        let deleted: bool = self.call("deleteMessage", &body).await?;

        if !deleted {
            return Err(NotifyError::Api {
                code: None,
                description: "deleteMessage returned false".into(),
            });
        }

        debug!("telegram message deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LinkButton, ParseMode};

    fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, NotifyError> {
        let envelope: ApiResponse<T> = serde_json::from_str(raw).unwrap();
        unwrap_response(envelope)
    }

    #[test]
    fn send_response_yields_message_id() {
        let sent: SentMessage =
            decode(r#"{"ok":true,"result":{"message_id":321,"chat":{"id":-100}}}"#).unwrap();
        assert_eq!(sent.message_id, MessageId(321));
    }

    #[test]
    fn refused_request_maps_to_api_error() {
        let err = decode::<bool>(
            r#"{"ok":false,"error_code":400,"description":"Bad Request: message to delete not found"}"#,
        )
        .unwrap_err();

        match err {
            NotifyError::Api { code, description } => {
                assert_eq!(code, Some(400));
                assert!(description.contains("not found"));
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn ok_without_result_is_an_error() {
        let err = decode::<bool>(r#"{"ok":true}"#).unwrap_err();
        assert!(matches!(err, NotifyError::MissingResult));
    }

    #[test]
    fn send_body_includes_mode_and_link() {
        let opts = SendOptions::html().with_link(Some(LinkButton {
            label: "Open platform".into(),
            url: "https://example.com/trade".into(),
        }));

        let body = send_message_body("-1001", "<b>hi</b>", &opts);

        assert_eq!(body["chat_id"], "-1001");
        assert_eq!(body["text"], "<b>hi</b>");
        assert_eq!(body["parse_mode"], "HTML");
        assert_eq!(body["disable_web_page_preview"], true);
        assert_eq!(
            body["reply_markup"]["inline_keyboard"][0][0]["url"],
            "https://example.com/trade"
        );
    }

    #[test]
    fn plain_body_omits_parse_mode_and_markup() {
        let opts = SendOptions {
            parse_mode: ParseMode::Plain,
            ..Default::default()
        };
        let body = send_message_body("42", "hello", &opts);

        assert!(body.get("parse_mode").is_none());
        assert!(body.get("reply_markup").is_none());
    }

    #[test]
    fn delete_body_carries_numeric_id() {
        let body = delete_message_body("42", MessageId(9));
        assert_eq!(body, json!({ "chat_id": "42", "message_id": 9 }));
    }

    #[tokio::test]
    async fn unreachable_api_is_an_http_error_without_token() {
        let client = TelegramNotifier::new("http://127.0.0.1:9", "SECRET-TOKEN").unwrap();
        let err = client
            .send("42", "hello", &SendOptions::html())
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Http(_)));
        assert!(!err.to_string().contains("SECRET-TOKEN"));
    }
}
