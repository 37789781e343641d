//! Prompt construction for LLM requests.
//!
//! Holds the fixed templates used by the query agent and builds the system
//! prompt for the SQL tool loop from the prompt prefix and the live schema.

use std::path::Path;

use crate::db::Schema;
use crate::error::{Result, Txt2SqlError};

/// Built-in prompt prefix for the tool loop.
const DEFAULT_PROMPT_PREFIX: &str = include_str!("../../prompts/system_prompt.txt");

/// Prefix of every user-role message that reports a tool-loop result.
pub const OBSERVATION_PREFIX: &str = "Observation:";

/// Template for generating SQL without running it.
pub const GENERATE_SQL_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "Given the following user question, generate a syntactically correct PostgreSQL query.\n\
     Do not execute the query, just return it.\n\
     \n\
     User question: {question}\n\
     \n\
     PostgreSQL query:",
);

/// Template for explaining a query in plain language.
pub const EXPLAIN_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "Explain what the following PostgreSQL query does in simple terms:\n\
     \n\
     ```sql\n\
     {query}\n\
     ```\n\
     \n\
     Explanation:",
);

/// Template for asking for improvements to a generated query.
pub const SUGGEST_TEMPLATE: PromptTemplate = PromptTemplate::new(
    "Given the user question and the SQL query generated for it, suggest possible improvements \
     to the query that might better address the user's intent or improve performance.\n\
     \n\
     User question: {question}\n\
     \n\
     SQL query:\n\
     ```sql\n\
     {query}\n\
     ```\n\
     \n\
     List each suggestion separately, numbered 1, 2, 3, etc.",
);

/// Instructions describing how the model drives the tool loop.
const TOOL_PROTOCOL: &str = r#"TOOLS:
You can run read-only SQL against the database. To run a statement, reply with
exactly one ```sql code block containing a single statement. The result comes
back in a message starting with "Observation:".
- Only SELECT, WITH, VALUES, EXPLAIN and SHOW statements are allowed.
- Look at the observation before deciding what to do next.
- When you have enough information, reply with the final answer in plain
  language and no code block."#;

/// A prompt with `{name}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    text: &'static str,
}

impl PromptTemplate {
    /// Wraps template text.
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    /// Returns the raw template text.
    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Substitutes `{name}` placeholders. Unknown placeholders stay as they are.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                let name = &after[..close];
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, close))
            });
            match substituted {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Loads the tool-loop prompt prefix, from `path` if given.
pub fn load_prompt_prefix(path: Option<&Path>) -> Result<String> {
    match path {
        None => Ok(DEFAULT_PROMPT_PREFIX.trim().to_string()),
        Some(path) => std::fs::read_to_string(path)
            .map(|content| content.trim().to_string())
            .map_err(|e| {
                Txt2SqlError::config(format!(
                    "Failed to read system prompt {}: {e}",
                    path.display()
                ))
            }),
    }
}

/// Builds the tool-loop system prompt: prefix, schema, then protocol.
pub fn build_agent_system_prompt(prefix: &str, schema: &Schema) -> String {
    format!(
        "{}\n\n{}\n\n{}",
        prefix.trim(),
        schema.format_for_llm().trim_end(),
        TOOL_PROTOCOL
    )
}

/// Formats a tool-loop result for the model.
pub fn observation(body: &str) -> String {
    format!("{OBSERVATION_PREFIX}\n{body}")
}
