//! LLM client factory.
//!
//! Centralizes provider-specific logic for creating LLM clients.

use std::sync::Arc;
use tracing::info;

use crate::config::{LlmConfig, Settings};
use crate::error::Result;
use crate::llm::{LlmClient, LlmProvider, MockLlmClient, OpenAiClient, OpenAiConfig};

/// Creates the LLM client selected by `config.provider`.
///
/// The OpenAI client takes its key and model from `settings`; the mock needs
/// neither.
pub fn create_client(config: &LlmConfig, settings: &Settings) -> Result<Arc<dyn LlmClient>> {
    let provider: LlmProvider = config.provider.parse()?;
    info!(provider = %provider, model = %settings.model, "Creating LLM client");

    match provider {
        LlmProvider::OpenAi => {
            let openai = OpenAiConfig::new(settings.api_key.clone(), settings.model.clone())
                .with_timeout(config.timeout_secs)
                .with_temperature(config.temperature);
            Ok(Arc::new(OpenAiClient::new(openai)?))
        }
        LlmProvider::Mock => Ok(Arc::new(MockLlmClient::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectionConfig;

    fn settings() -> Settings {
        Settings {
            api_key: "sk-test".to_string(),
            model: "gpt-4o".to_string(),
            connection: ConnectionConfig {
                host: "localhost".to_string(),
                port: 5432,
                database: "shop".to_string(),
                user: "app".to_string(),
                password: "secret".to_string(),
            },
        }
    }

    #[test]
    fn test_create_openai_client() {
        assert!(create_client(&LlmConfig::default(), &settings()).is_ok());
    }

    #[tokio::test]
    async fn test_create_mock_client() {
        let config = LlmConfig {
            provider: "mock".to_string(),
            ..LlmConfig::default()
        };
        let client = create_client(&config, &settings()).unwrap();
        let reply = client
            .complete(&[crate::llm::Message::user("show users")])
            .await
            .unwrap();
        assert!(reply.contains("SELECT"));
    }

    #[test]
    fn test_unknown_provider_fails() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            ..LlmConfig::default()
        };
        let err = create_client(&config, &settings()).err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider: ollama"));
    }
}
