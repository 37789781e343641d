//! Interactive prompt loop.
//!
//! Reads one line at a time, dispatches it, and prints the rendered output.
//! Generic over the reader and writer so tests can drive it from memory.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::handlers::{dispatch, CommandContext};
use super::help::HELP_TEXT;
use super::router::{Command, CommandRouter};
use crate::error::{Result, Txt2SqlError};

/// Prompt shown before each line of input.
pub const PROMPT: &str = "Enter query or command: ";

/// A read-dispatch-print loop over an async reader and writer.
pub struct Repl<'a, R, W> {
    ctx: CommandContext<'a>,
    reader: R,
    writer: W,
}

impl<'a, R, W> Repl<'a, R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(ctx: CommandContext<'a>, reader: R, writer: W) -> Self {
        Self { ctx, reader, writer }
    }

    /// Consumes the REPL and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Prints the help, then loops until `/exit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        self.write(&format!("Database connected successfully.\n\n{HELP_TEXT}\n"))
            .await?;

        let mut handled = 0usize;
        loop {
            self.write(&format!("\n{PROMPT}")).await?;

            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|e| Txt2SqlError::internal(format!("Failed to read input: {e}")))?;
            if read == 0 {
                self.write("\n").await?;
                debug!("End of input");
                break;
            }

            let command = CommandRouter::parse(&line);
            if command == Command::Empty {
                continue;
            }
            debug!(command = ?command, "Dispatching command");

            let output = dispatch(&self.ctx, command).await;
            handled += 1;
            if let Some(text) = output.render_text() {
                self.write(&format!("\n{text}\n")).await?;
            }
            if output.is_exit() {
                break;
            }
        }

        info!(commands = handled, "REPL finished");
        Ok(())
    }

    async fn write(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_all(text.as_bytes())
            .await
            .map_err(|e| Txt2SqlError::internal(format!("Failed to write output: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Txt2SqlError::internal(format!("Failed to write output: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{LoopOptions, QueryAgent};
    use crate::db::MockDatabaseClient;
    use crate::llm::MockLlmClient;
    use std::sync::Arc;

    async fn session(input: &str, llm: MockLlmClient) -> String {
        let agent = QueryAgent::new(
            Arc::new(MockDatabaseClient::seeded()),
            Arc::new(llm),
            "prefix",
            LoopOptions::default(),
        );
        let mut repl = Repl::new(CommandContext::new(&agent), input.as_bytes(), Vec::new());
        repl.run().await.unwrap();
        String::from_utf8(repl.into_writer()).unwrap()
    }

    #[tokio::test]
    async fn test_prints_help_and_exits() {
        let out = session("/exit\n/tables\n", MockLlmClient::new()).await;

        assert!(out.starts_with("Database connected successfully.\n\nAvailable commands:"));
        assert!(out.contains("\nEnter query or command: \nExiting...\n"));
        assert!(!out.contains("Database Tables:"));
    }

    #[tokio::test]
    async fn test_end_of_input_stops() {
        let out = session("/tables", MockLlmClient::new()).await;
        assert!(out.contains("Database Tables:\n- audit_log\n- orders\n- users"));
        assert!(out.ends_with(&format!("{PROMPT}\n")));
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let out = session("\n   \n/quit\n", MockLlmClient::new()).await;
        assert_eq!(out.matches(PROMPT).count(), 3);
        assert!(out.contains("Exiting..."));
    }

    #[tokio::test]
    async fn test_question_prints_result_and_timing() {
        let llm = MockLlmClient::new().with_script([
            "```sql\nSELECT * FROM orders LIMIT 10\n```",
            "There are 3 orders.",
        ]);
        let out = session("How many orders are there?\n/exit\n", llm).await;

        assert!(out.contains("Result:\nThere are 3 orders.\n\nQuery completed in "));
        assert!(out.contains(" seconds\n-----------\n"));
    }
}
