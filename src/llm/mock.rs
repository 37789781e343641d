//! Mock LLM client for testing.
//!
//! Provides deterministic responses based on input patterns, plus a scripted
//! queue for tests that need an exact sequence of replies.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{Result, Txt2SqlError};
use crate::llm::prompt::OBSERVATION_PREFIX;
use crate::llm::types::{Message, Role};
use crate::llm::LlmClient;

/// Mock LLM client that returns canned responses based on input patterns.
///
/// Used for unit testing and `--mock-db` demos without making real API calls.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    /// Custom response mappings (pattern -> response).
    custom_responses: Vec<(String, String)>,
    /// Replies returned in order before any pattern is consulted.
    script: Mutex<VecDeque<String>>,
    /// When set, every call fails with this message.
    failure: Option<String>,
    /// Number of `complete` calls so far.
    calls: AtomicUsize,
    /// Every message list the client was called with.
    transcript: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    /// Creates a new mock client with default responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock whose every call fails with an LLM error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Adds a custom response mapping.
    ///
    /// When the last user message contains `pattern` (case-insensitive), the
    /// mock returns `response`.
    pub fn with_response(
        mut self,
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        self.custom_responses
            .push((pattern.into(), response.into()));
        self
    }

    /// Queues replies that are returned one per call, ahead of any pattern.
    pub fn with_script<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut script) = self.script.lock() {
            script.extend(replies.into_iter().map(Into::into));
        }
        self
    }

    /// Number of completions requested so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received so far, oldest first.
    pub fn transcript(&self) -> Vec<Vec<Message>> {
        self.transcript
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    /// Generates a mock response based on the input.
    fn mock_response(&self, input: &str) -> String {
        let input_lower = input.to_lowercase();

        for (pattern, response) in &self.custom_responses {
            if input_lower.contains(&pattern.to_lowercase()) {
                return response.clone();
            }
        }

        if input.starts_with(OBSERVATION_PREFIX) {
            return "Here is what the database returned:\n\n".to_string()
                + input[OBSERVATION_PREFIX.len()..].trim();
        }

        if input_lower.starts_with("explain what the following postgresql query does") {
            return "This query reads rows from the database and returns them.".to_string();
        }

        if input_lower.starts_with("given the user question and the sql query") {
            return "1. Select only the columns you need.\n\n2. Add an ORDER BY for stable results.\n"
                .to_string();
        }

        if input_lower.starts_with("given the following user question") {
            return Self::generated_sql(&input_lower).to_string();
        }

        if input_lower.contains("orders") || input_lower.contains("users") {
            return format!("```sql\n{}\n```", Self::generated_sql(&input_lower));
        }

        "I don't understand that question. Could you please rephrase it?".to_string()
    }

    fn generated_sql(input_lower: &str) -> &'static str {
        if input_lower.contains("count") && input_lower.contains("orders") {
            "SELECT COUNT(*) FROM orders;"
        } else if input_lower.contains("orders") {
            "SELECT * FROM orders LIMIT 10;"
        } else {
            "SELECT * FROM users LIMIT 10;"
        }
    }

    /// Extracts the last user message content from a message list.
    fn extract_user_input(messages: &[Message]) -> String {
        messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut transcript) = self.transcript.lock() {
            transcript.push(messages.to_vec());
        }

        if let Some(message) = &self.failure {
            return Err(Txt2SqlError::llm(message.clone()));
        }

        if let Some(reply) = self.script.lock().ok().and_then(|mut s| s.pop_front()) {
            return Ok(reply);
        }

        let input = Self::extract_user_input(messages);
        Ok(self.mock_response(&input))
    }
}
