// prompt_engine/llm/gemini.rs — Google Gemini generateContent invoker

use super::{HttpTransport, ReqwestTransport};
use crate::prompt_engine::types::LLMError;
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-001:generateContent";

const GENERIC_API_ERROR: &str = "Error calling Gemini API";

// Fixed for wire compatibility; not user-configurable.
pub const TEMPERATURE: f64 = 0.2;
pub const TOP_K: u32 = 40;
pub const TOP_P: f64 = 0.95;
pub const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    /// A single user turn with the fixed generation parameters
    pub fn single_turn(text: String) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part { text }],
            }],
            generation_config: GenerationConfig::default(),
        }
    }

    /// Text of the first part of the first turn
    pub fn turn_text(&self) -> &str {
        self.contents
            .first()
            .and_then(|c| c.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationConfig {
    pub temperature: f64,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "topP")]
    pub top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: TEMPERATURE,
            top_k: TOP_K,
            top_p: TOP_P,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        }
    }
}

// Response side: every link is optional. Safety filtering can legitimately
// return zero candidates, and that is not an error.

#[derive(Debug, Default, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GeminiResponse {
    /// `candidates[0].content.parts[0].text`, or empty when any link is absent
    fn first_text(self) -> String {
        self.candidates
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|p| p.into_iter().next())
            .and_then(|p| p.text)
            .unwrap_or_default()
    }

    fn error_message(self) -> Option<String> {
        self.error
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
    }
}

/// Sends one compiled request to Gemini and extracts the generated text.
/// Exactly one round-trip per call: no retry, no backoff, no streaming.
pub struct GeminiInvoker {
    transport: Box<dyn HttpTransport>,
    endpoint: Url,
}

impl GeminiInvoker {
    /// reqwest-backed invoker
    pub fn new(endpoint: &str) -> Result<Self, LLMError> {
        Self::with_transport(ReqwestTransport::new(), endpoint)
    }

    pub fn with_transport(
        transport: impl HttpTransport + 'static,
        endpoint: &str,
    ) -> Result<Self, LLMError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| LLMError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        Ok(Self {
            transport: Box::new(transport),
            endpoint,
        })
    }

    /// Endpoint without credentials, safe to log
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn invoke(
        &self,
        body: &GenerateContentRequest,
        credential: &str,
    ) -> Result<String, LLMError> {
        // The provider expects the key as a query parameter, never a header.
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("key", credential);

        let payload = serde_json::to_string(body)
            .map_err(|e| LLMError::InvalidResponse(format!("Gemini encode: {}", e)))?;

        let response = self.transport.post_json(&url, payload).await?;

        if !response.is_success() {
            // Error detail lives in the body, so parse it before failing.
            let message = serde_json::from_str::<GeminiResponse>(&response.body)
                .ok()
                .and_then(GeminiResponse::error_message)
                .unwrap_or_else(|| GENERIC_API_ERROR.to_string());

            tracing::error!("Gemini API error {}: {}", response.status, message);
            return Err(LLMError::Api {
                status: response.status,
                message,
            });
        }

        let gemini: GeminiResponse = serde_json::from_str(&response.body)
            .map_err(|e| LLMError::InvalidResponse(format!("Gemini parse: {}", e)))?;

        Ok(gemini.first_text())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::prompt_engine::llm::TransportResponse;
    use crate::prompt_engine::types::ErrorKind;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    /// Canned-response transport that records every call
    #[derive(Clone)]
    pub(crate) struct FakeTransport {
        reply: Arc<dyn Fn() -> Result<TransportResponse, LLMError> + Send + Sync>,
        pub(crate) calls: Arc<Mutex<Vec<(Url, String)>>>,
    }

    impl FakeTransport {
        pub(crate) fn replying(status: u16, body: &str) -> Self {
            let body = body.to_string();
            Self {
                reply: Arc::new(move || {
                    Ok(TransportResponse {
                        status,
                        body: body.clone(),
                    })
                }),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn failing(reason: &str) -> Self {
            let reason = reason.to_string();
            Self {
                reply: Arc::new(move || Err(LLMError::Transport(reason.clone()))),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn post_json(
            &self,
            url: &Url,
            body: String,
        ) -> Result<TransportResponse, LLMError> {
            self.calls.lock().unwrap().push((url.clone(), body));
            (self.reply)()
        }
    }

    fn invoker(transport: &FakeTransport) -> GeminiInvoker {
        GeminiInvoker::with_transport(transport.clone(), DEFAULT_ENDPOINT).unwrap()
    }

    fn body() -> GenerateContentRequest {
        GenerateContentRequest::single_turn("SYSTEM: x\n\nRAW PROMPT: y".to_string())
    }

    #[tokio::test]
    async fn test_returns_first_candidate_text() {
        let transport = FakeTransport::replying(
            200,
            r#"{"candidates":[{"content":{"parts":[{"text":"ENHANCED"}]}}]}"#,
        );

        let text = invoker(&transport).invoke(&body(), "test-key").await.unwrap();

        assert_eq!(text, "ENHANCED");
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_candidates_is_empty_string() {
        let transport = FakeTransport::replying(200, r#"{"candidates":[]}"#);
        let text = invoker(&transport).invoke(&body(), "test-key").await.unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_missing_links_are_empty_string() {
        for reply in [
            r#"{}"#,
            r#"{"candidates":[{}]}"#,
            r#"{"candidates":[{"content":{}}]}"#,
            r#"{"candidates":[{"content":{"parts":[]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{}]}}]}"#,
            r#"{"candidates":null}"#,
        ] {
            let transport = FakeTransport::replying(200, reply);
            let text = invoker(&transport).invoke(&body(), "k").await.unwrap();
            assert_eq!(text, "", "reply {} should yield empty text", reply);
        }
    }

    #[tokio::test]
    async fn test_error_status_uses_provider_message() {
        let transport =
            FakeTransport::replying(400, r#"{"error":{"message":"invalid key"}}"#);

        let err = invoker(&transport).invoke(&body(), "bad").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.to_string(), "invalid key");
        match err {
            LLMError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "invalid key");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_status_without_message_is_generic() {
        for reply in ["<html>bad gateway</html>", r#"{"error":{}}"#, r#"{"error":{"message":""}}"#] {
            let transport = FakeTransport::replying(502, reply);
            let err = invoker(&transport).invoke(&body(), "k").await.unwrap_err();
            assert_eq!(err.to_string(), "Error calling Gemini API");
            assert_eq!(err.kind(), ErrorKind::Api);
        }
    }

    #[tokio::test]
    async fn test_network_failure_is_transport_error() {
        let transport = FakeTransport::failing("connection reset by peer");
        let err = invoker(&transport).invoke(&body(), "k").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_success_with_non_json_body_is_invalid_response() {
        let transport = FakeTransport::replying(200, "not json");
        let err = invoker(&transport).invoke(&body(), "k").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_key_is_sent_as_query_parameter() {
        let transport = FakeTransport::replying(200, r#"{"candidates":[]}"#);
        invoker(&transport).invoke(&body(), "a&b=c").await.unwrap();

        let calls = transport.calls.lock().unwrap();
        let (url, payload) = &calls[0];
        let key: Vec<_> = url.query_pairs().filter(|(k, _)| k == "key").collect();
        assert_eq!(key.len(), 1);
        assert_eq!(key[0].1, "a&b=c");
        assert!(url.as_str().starts_with(DEFAULT_ENDPOINT));

        let sent: serde_json::Value = serde_json::from_str(payload).unwrap();
        assert_eq!(sent["contents"][0]["role"], "user");
        assert_eq!(sent["generationConfig"]["topK"], 40);
        assert_eq!(sent["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_generation_config_serializes_exact_constants() {
        let json = serde_json::to_string(&GenerationConfig::default()).unwrap();
        assert_eq!(
            json,
            r#"{"temperature":0.2,"topK":40,"topP":0.95,"maxOutputTokens":2048}"#
        );
    }

    #[test]
    fn test_invalid_endpoint_is_rejected() {
        let err = GeminiInvoker::with_transport(FakeTransport::failing("unused"), "not a url")
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidEndpoint);
    }

    #[tokio::test]
    async fn test_reqwest_round_trip_against_local_server() {
        let mut server = mockito::Server::new_async().await;
        let expected_body = serde_json::to_string(&body()).unwrap();
        let mock = server
            .mock("POST", "/v1beta/models/test:generateContent")
            .match_query(mockito::Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_header("content-type", "application/json")
            .match_body(mockito::Matcher::JsonString(expected_body))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"ENHANCED"}]}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let endpoint = format!("{}/v1beta/models/test:generateContent", server.url());
        let text = GeminiInvoker::new(&endpoint)
            .unwrap()
            .invoke(&body(), "test-key")
            .await
            .unwrap();

        assert_eq!(text, "ENHANCED");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_reqwest_error_status_carries_provider_message() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let err = GeminiInvoker::new(&server.url())
            .unwrap()
            .invoke(&body(), "bad-key")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "API key not valid");
    }

    #[tokio::test]
    async fn test_reqwest_server_error_with_html_body_is_generic() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", mockito::Matcher::Any)
            .with_status(500)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let err = GeminiInvoker::new(&server.url())
            .unwrap()
            .invoke(&body(), "k")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.to_string(), "Error calling Gemini API");
    }
}
