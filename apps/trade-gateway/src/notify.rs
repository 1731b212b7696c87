//! Outbound notification sink.
//!
//! Trade outcomes and fatal connection events are pushed to a
//! human-readable message channel. The sink is fire-and-forget: delivery
//! failures are logged and never surface into the trading path.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// A push-message sink for trade outcomes.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one text message; never fails the caller.
    async fn send_text(&self, message: &str);
}

/// Sink that drops every message; used when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn send_text(&self, _message: &str) {}
}

/// Signed-webhook sink.
///
/// Posts `{"msgtype": "text", "text": {"content": ...}}` to the configured
/// URL with `timestamp` and `sign` query parameters, where `sign` is the
/// hex HMAC-SHA256 of `"{timestamp}\n{secret}"` under the shared secret.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    secret: String,
}

impl WebhookNotifier {
    /// A sink posting to `url`, signing with `secret`.
    #[must_use]
    pub fn new(url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            secret: secret.into(),
        }
    }

    /// Signature for a millisecond timestamp.
    fn sign(&self, timestamp_ms: i64) -> String {
        let payload = format!("{timestamp_ms}\n{}", self.secret);
        let mut mac = match HmacSha256::new_from_slice(self.secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send_text(&self, message: &str) {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let sign = self.sign(timestamp);
        let body = serde_json::json!({
            "msgtype": "text",
            "text": { "content": message },
            "at": { "isAtAll": false },
        });

        let result = self
            .client
            .post(&self.url)
            .query(&[("timestamp", timestamp.to_string()), ("sign", sign)])
            .json(&body)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(message, "notification delivered");
            }
            Ok(response) => {
                tracing::warn!(
                    status = %response.status(),
                    message,
                    "notification endpoint refused the message"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, message, "notification delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn signature_is_deterministic_hex() {
        let notifier = WebhookNotifier::new("http://localhost", "secret");
        let a = notifier.sign(1_700_000_000_000);
        let b = notifier.sign(1_700_000_000_000);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, notifier.sign(1_700_000_000_001));
    }

    #[tokio::test]
    async fn posts_signed_text_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "msgtype": "text",
                "text": { "content": "order placed" },
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(server.uri(), "secret");
        notifier.send_text("order placed").await;

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default();
        assert!(query.contains("timestamp="));
        assert!(query.contains("sign="));
    }

    #[tokio::test]
    async fn delivery_failure_does_not_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        // Must not panic or error.
        WebhookNotifier::new(server.uri(), "secret")
            .send_text("dropped")
            .await;
    }
}
