//! Chat transports.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::chunk::message_len;
use crate::error::{NotifyError, Result};

/// Default bound on a single send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Longest message the Telegram Bot API accepts, in UTF-16 code units.
pub const TELEGRAM_MAX_MESSAGE: usize = 4096;

/// A destination that accepts plain-text messages.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Get the name of this transport.
    fn name(&self) -> &str;

    /// Longest message this transport accepts, as measured by [`message_len`].
    fn max_message_len(&self) -> usize;

    /// Send one message. The text is delivered verbatim.
    async fn send(&self, text: &str) -> Result<()>;
}

/// Telegram Bot API transport.
pub struct TelegramTransport {
    /// Bot token.
    bot_token: String,

    /// Destination chat.
    chat_id: String,

    /// API base URL.
    base_url: String,

    /// Bound on each request.
    timeout: Duration,

    /// HTTP client.
    client: reqwest::Client,
}

impl TelegramTransport {
    /// Create a transport for `chat_id` using `bot_token`.
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            base_url: "https://api.telegram.org".to_string(),
            timeout: DEFAULT_SEND_TIMEOUT,
            client: reqwest::Client::new(),
        }
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Destination chat.
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    fn max_message_len(&self) -> usize {
        TELEGRAM_MAX_MESSAGE
    }

    async fn send(&self, text: &str) -> Result<()> {
        if self.bot_token.is_empty() || self.chat_id.is_empty() {
            return Err(NotifyError::NotConfigured(
                "bot token and chat id are required".to_string(),
            ));
        }

        let length = message_len(text);
        if length > TELEGRAM_MAX_MESSAGE {
            return Err(NotifyError::MessageTooLong {
                length,
                max_length: TELEGRAM_MAX_MESSAGE,
            });
        }

        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.base_url, self.bot_token))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(NotifyError::ApiRequest {
                status: status.as_u16(),
                body,
            });
        }

        // Telegram reports some rejections with a 200 and `ok: false`.
        if let Ok(reply) = serde_json::from_str::<TelegramReply>(&body) {
            if !reply.ok {
                return Err(NotifyError::ApiRequest {
                    status: status.as_u16(),
                    body: reply.description.unwrap_or(body),
                });
            }
        }

        debug!(chars = length, "Delivered message to chat {}", self.chat_id);
        Ok(())
    }
}

impl TelegramTransport {
    fn classify(&self, error: reqwest::Error) -> NotifyError {
        if error.is_timeout() {
            NotifyError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            NotifyError::Http(error)
        }
    }
}

/// Telegram API reply envelope.
#[derive(Debug, Deserialize)]
struct TelegramReply {
    ok: bool,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport(server: &MockServer) -> TelegramTransport {
        TelegramTransport::new("123:abc", "42").with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_send_posts_plain_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "42",
                "text": "+hello\n",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        transport(&server).send("+hello\n").await.unwrap();
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Bad Request: chat not found",
            })))
            .mount(&server)
            .await;

        let err = transport(&server).send("hi").await.unwrap_err();

        match err {
            NotifyError::ApiRequest { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("chat not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_ok_false_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "description": "Forbidden: bot was blocked by the user",
            })))
            .mount(&server)
            .await;

        let err = transport(&server).send("hi").await.unwrap_err();

        assert!(err.to_string().contains("bot was blocked"));
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = transport(&server)
            .with_timeout(Duration::from_millis(100))
            .send("hi")
            .await
            .unwrap_err();

        assert!(matches!(err, NotifyError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let err = TelegramTransport::new("", "42").send("hi").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured(_)));
    }

    #[tokio::test]
    async fn test_oversized_message_is_rejected_locally() {
        let server = MockServer::start().await;
        let text = "x".repeat(TELEGRAM_MAX_MESSAGE + 1);

        let err = transport(&server).send(&text).await.unwrap_err();

        assert!(matches!(err, NotifyError::MessageTooLong { .. }));
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn test_emoji_count_twice_toward_the_limit() {
        let server = MockServer::start().await;
        // 2100 characters, 4200 UTF-16 units.
        let text = "\u{1F600}".repeat(2100);

        let err = transport(&server).send(&text).await.unwrap_err();

        match err {
            NotifyError::MessageTooLong { length, max_length } => {
                assert_eq!(length, 4200);
                assert_eq!(max_length, TELEGRAM_MAX_MESSAGE);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(server.received_requests().await.unwrap_or_default().is_empty());
    }
}
