use super::{validate_push_token, PushSender};
use crate::config::AppConfig;
use crate::error::NotifyError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://exp.host/--/api/v2/push/send";

/// Expo push service client. One request per message, no retries.
#[derive(Clone)]
pub struct ExpoPushClient {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl ExpoPushClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(cfg.push_endpoint.clone()).with_timeout(cfg.push_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ExpoPushClient {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl PushSender for ExpoPushClient {
    async fn send(&self, token: &str, title: &str, body: &str) -> Result<Value, NotifyError> {
        validate_push_token(token)?;

        let payload = ExpoMessage {
            to: token,
            title,
            body,
            sound: "default",
        };

        let rsp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = rsp.status();
        let text = rsp.text().await?;

        // Gateways in front of the provider answer with HTML, so the status
        // is checked before the body is treated as JSON.
        if !status.is_success() {
            return Err(NotifyError::Rejected(format!("HTTP {status}: {}", text.trim())));
        }
        let answer: Value = serde_json::from_str(&text)
            .map_err(|e| NotifyError::Rejected(format!("unreadable provider answer: {e}")))?;
        if let Some(reason) = ticket_error(&answer) {
            return Err(NotifyError::Rejected(reason));
        }
        Ok(answer)
    }
}

#[derive(Serialize)]
struct ExpoMessage<'a> {
    to: &'a str,
    title: &'a str,
    body: &'a str,
    sound: &'static str,
}

/// Expo answers 200 even for refused messages; the ticket says `"status": "error"`.
fn ticket_error(answer: &Value) -> Option<String> {
    if let Some(errors) = answer.get("errors").and_then(Value::as_array) {
        if let Some(first) = errors.first() {
            return Some(
                first
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("request error")
                    .to_string(),
            );
        }
    }

    let tickets: Vec<&Value> = match answer.get("data") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    };

    tickets
        .into_iter()
        .find(|t| t.get("status").and_then(Value::as_str) == Some("error"))
        .map(|t| {
            let message = t.get("message").and_then(Value::as_str).unwrap_or("error");
            match t.pointer("/details/error").and_then(Value::as_str) {
                Some(code) => format!("{code}: {message}"),
                None => message.to_string(),
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ok_ticket_is_not_an_error() {
        let v = json!({ "data": { "status": "ok", "id": "XXXX-XXXX" } });
        assert_eq!(ticket_error(&v), None);
    }

    #[test]
    fn error_ticket_carries_code() {
        let v = json!({
            "data": [{
                "status": "error",
                "message": "\"ExponentPushToken[x]\" is not a registered push notification recipient",
                "details": { "error": "DeviceNotRegistered" }
            }]
        });
        let reason = ticket_error(&v).unwrap();
        assert!(reason.starts_with("DeviceNotRegistered: "));
    }

    #[test]
    fn request_level_errors_are_reported() {
        let v = json!({ "errors": [{ "code": "VALIDATION_ERROR", "message": "\"to\" is required" }] });
        assert_eq!(ticket_error(&v).as_deref(), Some("\"to\" is required"));
    }

    /// One-shot HTTP server on a free local port answering `status` with `body`.
    async fn serve_once(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = sock.read(&mut buf).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(reply.as_bytes()).await.unwrap();
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/push")
    }

    #[tokio::test]
    async fn gateway_error_page_keeps_status_and_body() {
        let endpoint = serve_once("502 Bad Gateway", "text/html", "<html>502 Bad Gateway</html>").await;
        let client = ExpoPushClient::new(endpoint);

        let err = client.send("ExponentPushToken[abc]", "t", "b").await.unwrap_err();
        assert_eq!(err.kind(), "NotificationDeliveryFailure");
        match err {
            NotifyError::Rejected(reason) => {
                assert!(reason.starts_with("HTTP 502"), "{reason}");
                assert!(reason.contains("<html>502 Bad Gateway</html>"), "{reason}");
            }
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn accepted_ticket_is_returned() {
        let endpoint = serve_once(
            "200 OK",
            "application/json",
            r#"{"data":{"status":"ok","id":"XXXX-XXXX"}}"#,
        )
        .await;
        let client = ExpoPushClient::new(endpoint);

        let answer = client.send("ExpoPushToken[abc]", "t", "b").await.unwrap();
        assert_eq!(answer["data"]["id"], "XXXX-XXXX");
    }

    #[tokio::test]
    async fn bad_token_never_reaches_the_network() {
        // Unroutable endpoint: a request attempt would fail with Http, not InvalidTokenFormat.
        let client = ExpoPushClient::new("http://127.0.0.1:9/push");
        let err = client.send("bad-token", "t", "b").await.unwrap_err();
        assert!(matches!(err, NotifyError::InvalidTokenFormat));
    }
}
