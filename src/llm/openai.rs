//! OpenAI chat-completions client.
//!
//! One HTTP request per completion. Failures are reported immediately; there
//! is no retry or backoff.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Result, Txt2SqlError};
use crate::llm::types::Message;
use crate::llm::LlmClient;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// OpenAI chat-completions endpoint.
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI client configuration.
#[derive(Clone)]
pub struct OpenAiConfig {
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier (e.g. "gpt-4o").
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Sampling temperature.
    pub temperature: f32,
    /// Endpoint URL.
    pub api_url: String,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiConfig {
    /// Creates a config with the given API key and model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            api_url: OPENAI_API_URL.to_string(),
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Points the client at a compatible endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

/// OpenAI LLM client.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiClient {
    /// Creates a client with the given configuration.
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Txt2SqlError::llm(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn build_request(&self, messages: &[Message]) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| OpenAiMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: self.config.temperature,
        }
    }

    /// Maps a non-success HTTP response to an error.
    fn parse_error(status: StatusCode, body: &str) -> Txt2SqlError {
        if status == StatusCode::UNAUTHORIZED {
            return Txt2SqlError::llm("Authentication failed. Check your OPENAI_API_KEY.");
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Txt2SqlError::llm("Rate limited. Please wait and try again.");
        }

        match serde_json::from_str::<OpenAiErrorResponse>(body) {
            Ok(error_response) => Txt2SqlError::llm(format!(
                "OpenAI API error: {}",
                error_response.error.message
            )),
            Err(_) => Txt2SqlError::llm(format!("OpenAI API error ({status}): {body}")),
        }
    }

    fn parse_response(body: &str) -> Result<String> {
        let response: OpenAiResponse = serde_json::from_str(body)
            .map_err(|e| Txt2SqlError::llm(format!("Failed to parse response: {e}")))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Txt2SqlError::llm("No response from OpenAI"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let request = self.build_request(messages);
        let start = Instant::now();

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Txt2SqlError::llm("Request timed out.")
                } else if e.is_connect() {
                    Txt2SqlError::llm("Failed to connect to OpenAI API. Check your network.")
                } else {
                    Txt2SqlError::llm(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Txt2SqlError::llm(format!("Failed to read response: {e}")))?;

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            status = status.as_u16(),
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAI completion finished"
        );

        if !status.is_success() {
            return Err(Self::parse_error(status, &body));
        }

        Self::parse_response(&body)
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiError,
}

#[derive(Debug, Deserialize)]
struct OpenAiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = OpenAiConfig::new("sk-test", "gpt-4o");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.api_url, OPENAI_API_URL);
    }

    #[test]
    fn test_config_debug_hides_key() {
        let config = OpenAiConfig::new("sk-secret", "gpt-4o");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }

    #[test]
    fn test_build_request() {
        let client = OpenAiClient::new(
            OpenAiConfig::new("sk-test", "gpt-4o")
                .with_timeout(5)
                .with_temperature(0.2),
        )
        .unwrap();
        let request = client.build_request(&[Message::system("rules"), Message::user("hi")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert!((json["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1"}}]}"#;
        assert_eq!(OpenAiClient::parse_response(body).unwrap(), "SELECT 1");
    }

    #[test]
    fn test_parse_response_without_choices() {
        let err = OpenAiClient::parse_response(r#"{"choices":[]}"#).unwrap_err();
        assert_eq!(err.to_string(), "LLM error: No response from OpenAI");
    }

    #[test]
    fn test_parse_response_malformed() {
        let err = OpenAiClient::parse_response("not json").unwrap_err();
        assert!(err.to_string().contains("Failed to parse response"));
    }

    #[test]
    fn test_parse_error_unauthorized() {
        let error = OpenAiClient::parse_error(StatusCode::UNAUTHORIZED, "");
        assert!(error.to_string().contains("Authentication failed"));
    }

    #[test]
    fn test_parse_error_rate_limited() {
        let error = OpenAiClient::parse_error(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(error.to_string().contains("Rate limited"));
    }

    #[test]
    fn test_parse_error_with_message() {
        let body = r#"{"error":{"message":"The model `gpt-x` does not exist"}}"#;
        let error = OpenAiClient::parse_error(StatusCode::NOT_FOUND, body);
        assert_eq!(
            error.to_string(),
            "LLM error: OpenAI API error: The model `gpt-x` does not exist"
        );
    }

    #[test]
    fn test_parse_error_plain_body() {
        let error = OpenAiClient::parse_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(error.to_string().contains("502"));
        assert!(error.to_string().contains("upstream down"));
    }
}
