// prompt_engine/llm/mod.rs — HTTP transport seam for the Gemini invoker

pub mod gemini;

use super::types::LLMError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use std::time::Duration;

/// Status and raw body of a completed HTTP exchange
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single JSON POST. Implementations must not retry.
///
/// Any status code is a successful exchange at this layer; only failures to
/// complete the exchange are reported as `LLMError::Transport`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, url: &Url, body: String) -> Result<TransportResponse, LLMError>;
}

/// reqwest-backed transport. Connection pooling is left to the client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// No timeout: callers that need one should use `with_timeout`.
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, url: &Url, body: String) -> Result<TransportResponse, LLMError> {
        // reqwest errors embed the URL, which carries the API key in its query.
        let response = self
            .client
            .post(url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| LLMError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| LLMError::Transport(e.without_url().to_string()))?;

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt_engine::types::ErrorKind;

    #[tokio::test]
    async fn test_posts_json_and_returns_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .match_header("content-type", "application/json")
            .match_body(r#"{"hello":"world"}"#)
            .with_status(418)
            .with_body("teapot")
            .expect(1)
            .create_async()
            .await;

        let url = Url::parse(&format!("{}/generate", server.url())).unwrap();
        let response = ReqwestTransport::new()
            .post_json(&url, r#"{"hello":"world"}"#.to_string())
            .await
            .unwrap();

        assert_eq!(response.status, 418);
        assert_eq!(response.body, "teapot");
        assert!(!response.is_success());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error_without_key() {
        // Nothing listens on port 1.
        let url = Url::parse("http://127.0.0.1:1/generate?key=secret-key").unwrap();
        let err = ReqwestTransport::with_timeout(Duration::from_secs(5))
            .post_json(&url, "{}".to_string())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.to_string().contains("secret-key"));
    }
}
