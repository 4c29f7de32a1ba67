use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat endpoint of the HealthOSS backend.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/chat";

const BODY_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("chat backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("chat backend reply was not understood: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends one query to the assistant and yields its reply.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, query: &str) -> Result<String, TransportError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, query: &str) -> Result<String, TransportError> {
        tracing::debug!(endpoint = %self.endpoint, "posting chat query");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(&ChatRequest { query })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status,
                body: text.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        let chat_response: ChatResponse = serde_json::from_str(&text)?;
        Ok(chat_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_send_posts_query_and_returns_response() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/chat")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "query": "How much water should I drink?"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "Aim for about 2 liters a day."}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/chat", server.url()));
        let reply = transport.send("How much water should I drink?").await;

        mock.assert_async().await;
        assert_eq!(reply.unwrap(), "Aim for about 2 liters a day.");
    }

    #[tokio::test]
    async fn test_send_sends_query_untrimmed() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/chat")
            .match_body(Matcher::Json(serde_json::json!({ "query": "  sleep tips \n" })))
            .with_status(200)
            .with_body(r#"{"response": "ok"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/chat", server.url()));
        assert_eq!(transport.send("  sleep tips \n").await.unwrap(), "ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_error_status() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/chat")
            .with_status(500)
            .with_body(r#"{"detail": "agent crashed"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/chat", server.url()));
        match transport.send("hi").await {
            Err(TransportError::Status { status, body }) => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert!(body.contains("agent crashed"));
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_rejects_body_without_response_field() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body(r#"{"answer": "wrong field"}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/chat", server.url()));
        let result = transport.send("hi").await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_send_rejects_non_json_body() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/chat")
            .with_status(200)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let transport = HttpTransport::new(&format!("{}/chat", server.url()));
        let result = transport.send("hi").await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_send_connection_refused() {
        // Bind then drop a listener so the port is very likely closed.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = HttpTransport::new(&format!("http://{}/chat", addr));
        let result = transport.send("hi").await;
        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    #[test]
    fn test_default_endpoint() {
        assert_eq!(HttpTransport::default().endpoint(), "http://127.0.0.1:8080/chat");
    }
}
