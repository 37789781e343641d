//! Query agent: turns questions into SQL and answers.
//!
//! [`QueryAgent::answer`] runs the SQL tool loop against the live schema and
//! never fails; the single-shot operations propagate model errors.

mod result;
pub mod sql_loop;

pub use result::QueryResult;
pub use sql_loop::{LoopOptions, LoopOutcome, LoopStep, SqlToolLoop, StepStatus};

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::db::{DatabaseClient, SchemaInspector};
use crate::error::Result;
use crate::llm::prompt::{
    build_agent_system_prompt, EXPLAIN_TEMPLATE, GENERATE_SQL_TEMPLATE, SUGGEST_TEMPLATE,
};
use crate::llm::{LlmClient, Message};

impl From<&AgentConfig> for LoopOptions {
    fn from(config: &AgentConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            preview_rows: config.preview_rows,
            verbose: false,
        }
    }
}

/// Answers questions about one database with one model.
///
/// Built once per process and shared behind an `Arc`.
pub struct QueryAgent {
    inspector: SchemaInspector,
    llm: Arc<dyn LlmClient>,
    prompt_prefix: String,
    options: LoopOptions,
}

impl QueryAgent {
    /// Creates an agent.
    pub fn new(
        db: Arc<dyn DatabaseClient>,
        llm: Arc<dyn LlmClient>,
        prompt_prefix: impl Into<String>,
        options: LoopOptions,
    ) -> Self {
        Self {
            inspector: SchemaInspector::new(db),
            llm,
            prompt_prefix: prompt_prefix.into(),
            options,
        }
    }

    /// The schema inspector over the agent's database.
    pub fn inspector(&self) -> &SchemaInspector {
        &self.inspector
    }

    /// Loop options in effect.
    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    /// Answers a question by letting the model query the database.
    ///
    /// Every failure is folded into the returned [`QueryResult`].
    pub async fn answer(&self, question: &str) -> QueryResult {
        let start = Instant::now();
        info!(question_len = question.len(), "Answering question");

        match self.run_loop(question).await {
            Ok(outcome) => {
                info!(
                    steps = outcome.steps.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Question answered"
                );
                QueryResult::success(outcome.answer, start.elapsed())
            }
            Err(e) => {
                warn!(error = %e, "Question could not be answered");
                QueryResult::failure(e.to_string(), start.elapsed())
            }
        }
    }

    async fn run_loop(&self, question: &str) -> Result<LoopOutcome> {
        let schema = self.inspector.describe_schema().await?;
        let system_prompt = build_agent_system_prompt(&self.prompt_prefix, &schema);
        let db = self.inspector.client();

        SqlToolLoop::new(db.as_ref(), self.llm.as_ref(), &self.options)
            .run(system_prompt, question)
            .await
    }

    /// Asks the model for SQL without running it. The reply is returned as is.
    pub async fn generate_sql(&self, question: &str) -> Result<String> {
        let prompt = GENERATE_SQL_TEMPLATE.render(&[("question", question)]);
        self.complete_once(prompt, "generate_sql").await
    }

    /// Asks the model to explain a query in plain language.
    pub async fn explain(&self, sql: &str) -> Result<String> {
        let prompt = EXPLAIN_TEMPLATE.render(&[("query", sql)]);
        self.complete_once(prompt, "explain").await
    }

    /// Asks the model for improvements to `sql`, one entry per non-blank line.
    pub async fn suggest_improvements(&self, question: &str, sql: &str) -> Result<Vec<String>> {
        let prompt = SUGGEST_TEMPLATE.render(&[("question", question), ("query", sql)]);
        let response = self.complete_once(prompt, "suggest_improvements").await?;
        Ok(split_suggestions(&response))
    }

    async fn complete_once(&self, prompt: String, operation: &'static str) -> Result<String> {
        let start = Instant::now();
        let response = self.llm.complete(&[Message::user(prompt)]).await?;
        debug!(
            operation,
            response_len = response.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Completion finished"
        );
        Ok(response)
    }
}

fn split_suggestions(response: &str) -> Vec<String> {
    response
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
