//! Bounded propose-execute-observe loop.
//!
//! The model proposes a statement in a ```sql block, the loop runs it if the
//! safety guard allows it and feeds the outcome back as an observation. A
//! reply without a block ends the loop with that reply as the answer.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::db::DatabaseClient;
use crate::error::{Result, Txt2SqlError};
use crate::llm::prompt::observation;
use crate::llm::{parse_llm_response, LlmClient, Message};
use crate::safety::ensure_read_only;

/// Default number of statements the model may propose per question.
pub const DEFAULT_MAX_ATTEMPTS: usize = 5;

/// Default number of rows shown to the model per observation.
pub const DEFAULT_PREVIEW_ROWS: usize = 20;

/// Tunables for the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOptions {
    /// Maximum statements the model may propose.
    pub max_attempts: usize,
    /// Rows included in each observation.
    pub preview_rows: usize,
    /// Log each step at `info` instead of `debug`.
    pub verbose: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            preview_rows: DEFAULT_PREVIEW_ROWS,
            verbose: false,
        }
    }
}

/// Where the loop is.
#[derive(Debug)]
enum LoopState {
    AwaitingModel,
    Executing(String),
    Answered(String),
    Exhausted,
    Failed(Txt2SqlError),
}

/// How an executed statement turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// The statement ran and returned this many rows.
    Rows(usize),
    /// The safety guard refused the statement.
    Rejected(String),
    /// The database reported an error.
    Failed(String),
}

/// One statement proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopStep {
    /// The statement text.
    pub sql: String,
    /// What happened to it.
    pub status: StepStatus,
}

/// The final answer plus every statement tried along the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    pub answer: String,
    pub steps: Vec<LoopStep>,
}

/// Runs the tool loop for one question.
pub struct SqlToolLoop<'a> {
    db: &'a dyn DatabaseClient,
    llm: &'a dyn LlmClient,
    options: &'a LoopOptions,
}

impl<'a> SqlToolLoop<'a> {
    pub fn new(db: &'a dyn DatabaseClient, llm: &'a dyn LlmClient, options: &'a LoopOptions) -> Self {
        Self { db, llm, options }
    }

    /// Drives the conversation until the model answers, fails, or runs out of attempts.
    pub async fn run(&self, system_prompt: String, question: &str) -> Result<LoopOutcome> {
        let mut messages = vec![Message::system(system_prompt), Message::user(question)];
        let mut steps: Vec<LoopStep> = Vec::new();
        let mut attempts = 0usize;
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => match self.llm.complete(&messages).await {
                    Err(e) => LoopState::Failed(e),
                    Ok(reply) => {
                        let parsed = parse_llm_response(&reply);
                        messages.push(Message::assistant(reply));
                        match parsed.sql {
                            None => LoopState::Answered(parsed.text),
                            Some(_) if attempts >= self.options.max_attempts => {
                                LoopState::Exhausted
                            }
                            Some(sql) => {
                                attempts += 1;
                                LoopState::Executing(sql)
                            }
                        }
                    }
                },
                LoopState::Executing(sql) => {
                    let (status, feedback) = self.execute(&sql).await;
                    self.log_step(attempts, &sql, &status);
                    steps.push(LoopStep { sql, status });
                    messages.push(Message::user(observation(&feedback)));
                    LoopState::AwaitingModel
                }
                LoopState::Answered(answer) => {
                    debug!(steps = steps.len(), answer_len = answer.len(), "Tool loop answered");
                    return Ok(LoopOutcome { answer, steps });
                }
                LoopState::Exhausted => {
                    warn!(attempts, "Tool loop exhausted its attempts");
                    return Err(Txt2SqlError::agent(format!(
                        "Agent stopped after {attempts} SQL attempts without a final answer"
                    )));
                }
                LoopState::Failed(e) => return Err(e),
            };
        }
    }

    /// Runs one proposed statement and renders the observation text.
    async fn execute(&self, sql: &str) -> (StepStatus, String) {
        if let Err(e) = ensure_read_only(sql) {
            let message = e.to_string();
            let feedback =
                format!("{message}. Only read-only queries are allowed; rewrite it as a SELECT.");
            return (StepStatus::Rejected(message), feedback);
        }

        let start = Instant::now();
        match self.db.execute_query(sql).await {
            Err(e) => {
                let message = e.to_string();
                (StepStatus::Failed(message.clone()), format!("Error: {message}"))
            }
            Ok(rows) => {
                debug!(
                    rows = rows.row_count(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Tool loop statement executed"
                );
                let total = rows.row_count();
                let preview = self.options.preview_rows;
                let mut feedback = if total > preview {
                    format!("Query returned {total} rows (showing first {preview}).")
                } else {
                    format!("Query returned {total} {}.", if total == 1 { "row" } else { "rows" })
                };
                if rows.was_truncated {
                    feedback.push_str(" The result was cut off at the row limit.");
                }
                let table = rows.to_text_table(Some(preview));
                if !table.is_empty() {
                    feedback.push('\n');
                    feedback.push_str(&table);
                }
                (StepStatus::Rows(total), feedback)
            }
        }
    }

    fn log_step(&self, attempt: usize, sql: &str, status: &StepStatus) {
        if self.options.verbose {
            info!(attempt, sql, status = ?status, "Tool loop step");
        } else {
            debug!(attempt, sql, status = ?status, "Tool loop step");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FailingDatabaseClient, MockDatabaseClient};
    use crate::llm::{MockLlmClient, Role};
    use pretty_assertions::assert_eq;

    fn options(max_attempts: usize) -> LoopOptions {
        LoopOptions {
            max_attempts,
            preview_rows: 2,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_answer_without_sql() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_script(["There is nothing to look up."]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "hello")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "There is nothing to look up.");
        assert!(outcome.steps.is_empty());
        assert!(db.executed().is_empty());
    }

    #[tokio::test]
    async fn test_executes_then_answers() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_script([
            "Let me check.\n```sql\nSELECT * FROM orders LIMIT 10\n```",
            "There are 3 orders.",
        ]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "How many orders?")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "There are 3 orders.");
        assert_eq!(
            outcome.steps,
            vec![LoopStep {
                sql: "SELECT * FROM orders LIMIT 10".to_string(),
                status: StepStatus::Rows(3),
            }]
        );

        let second_call = &llm.transcript()[1];
        assert_eq!(second_call.len(), 4);
        assert_eq!(second_call[0].role, Role::System);
        assert_eq!(second_call[2].role, Role::Assistant);
        let observation = &second_call[3].content;
        assert!(observation.starts_with("Observation:\nQuery returned 3 rows (showing first 2)."));
        assert!(observation.contains("id | user_id | total"));
    }

    #[tokio::test]
    async fn test_rejected_statement_is_not_executed() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_script([
            "```sql\nDELETE FROM orders\n```",
            "I can't delete data.",
        ]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "Remove all orders")
            .await
            .unwrap();

        assert!(db.executed().is_empty());
        assert!(matches!(&outcome.steps[0].status, StepStatus::Rejected(msg) if msg.contains("DELETE")));
        let observation = &llm.transcript()[1][3].content;
        assert!(observation.contains("Only read-only queries are allowed"));
    }

    #[tokio::test]
    async fn test_sequence_write_inside_select_is_not_executed() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_script([
            "```sql\nSELECT setval('orders_id_seq', 424242)\n```",
            "I won't change the sequence.",
        ]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "Bump the order id sequence")
            .await
            .unwrap();

        assert!(db.executed().is_empty());
        assert!(
            matches!(&outcome.steps[0].status, StepStatus::Rejected(msg) if msg.contains("setval"))
        );
    }

    #[tokio::test]
    async fn test_database_error_is_fed_back() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_script([
            "```sql\nSELECT * FROM missing LIMIT 5\n```",
            "That table does not exist.",
        ]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "Show the missing table")
            .await
            .unwrap();

        assert!(matches!(&outcome.steps[0].status, StepStatus::Failed(msg) if msg.contains("does not exist")));
        assert!(llm.transcript()[1][3].content.starts_with("Observation:\nError: "));
    }

    #[tokio::test]
    async fn test_exhaustion() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::new().with_response("", "```sql\nSELECT 1\n```");
        let opts = options(2);

        let err = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "loop forever")
            .await
            .unwrap_err();

        assert!(matches!(err, Txt2SqlError::Agent(_)));
        assert_eq!(
            err.to_string(),
            "Agent error: Agent stopped after 2 SQL attempts without a final answer"
        );
        assert_eq!(db.executed().len(), 2);
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let db = MockDatabaseClient::seeded();
        let llm = MockLlmClient::failing("Rate limited. Please wait and try again.");
        let opts = options(3);

        let err = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "anything")
            .await
            .unwrap_err();

        assert!(matches!(err, Txt2SqlError::Llm(_)));
    }

    #[tokio::test]
    async fn test_connection_failure_is_observation() {
        let db = FailingDatabaseClient::new();
        let llm = MockLlmClient::new().with_script(["```sql\nSELECT 1\n```", "The database is down."]);
        let opts = options(3);

        let outcome = SqlToolLoop::new(&db, &llm, &opts)
            .run("rules".to_string(), "ping")
            .await
            .unwrap();

        assert_eq!(outcome.answer, "The database is down.");
        assert!(matches!(outcome.steps[0].status, StepStatus::Failed(_)));
    }
}
