//! Transport-agnostic command output types.
//!
//! These types represent command results independently of the presentation
//! layer. The REPL renders them as plain text; other front-ends can convert
//! them to their own representation.

use crate::agent::QueryResult;
use crate::commands::help::HELP_HINT;
use crate::db::format_table;

/// Output from a command handler.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutput {
    /// Nothing to show.
    None,

    /// Informational message.
    Info(String),

    /// Error message.
    Error(String),

    /// Structured table data for display.
    Table {
        /// Column headers.
        headers: Vec<String>,
        /// Row data (each row is a vector of cell values).
        rows: Vec<Vec<String>>,
    },

    /// Outcome of a natural language question.
    Answer(QueryResult),

    /// SQL generated without being run.
    Sql(String),

    /// Application control action.
    Control(ControlAction),

    /// Multiple outputs (for commands that produce several messages).
    Multiple(Vec<CommandOutput>),
}

/// Control actions that affect application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Exit the application.
    Exit,
}

impl CommandOutput {
    /// Creates an info message.
    pub fn info(msg: impl Into<String>) -> Self {
        Self::Info(msg.into())
    }

    /// Creates an error message.
    pub fn error(msg: impl Into<String>) -> Self {
        Self::Error(msg.into())
    }

    /// Creates a table output.
    pub fn table(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self::Table { headers, rows }
    }

    /// Creates a multiple output from a vector.
    pub fn multiple(outputs: Vec<CommandOutput>) -> Self {
        Self::Multiple(outputs)
    }

    /// Creates an exit control action.
    pub fn exit() -> Self {
        Self::Control(ControlAction::Exit)
    }

    /// Returns true if this output, or any nested output, asks to exit.
    pub fn is_exit(&self) -> bool {
        match self {
            Self::Control(ControlAction::Exit) => true,
            Self::Multiple(outputs) => outputs.iter().any(Self::is_exit),
            _ => false,
        }
    }

    /// Renders the output as plain text, or `None` if there is nothing to print.
    pub fn render_text(&self) -> Option<String> {
        match self {
            Self::None | Self::Control(_) => None,
            Self::Info(msg) | Self::Error(msg) => Some(msg.clone()),
            Self::Table { headers, rows } => Some(format_table(headers, rows)),
            Self::Sql(sql) => Some(format!("Generated SQL:\n{sql}")),
            Self::Answer(result) => {
                let body = match (&result.output, &result.error) {
                    (Some(output), _) if result.success => output.clone(),
                    (_, Some(error)) => format!("Error: {error}"),
                    _ => String::new(),
                };
                Some(format!(
                    "Result:\n{body}\n\nQuery completed in {} seconds\n-----------\n{HELP_HINT}",
                    result.seconds_display()
                ))
            }
            Self::Multiple(outputs) => {
                let parts: Vec<String> = outputs.iter().filter_map(Self::render_text).collect();
                (!parts.is_empty()).then(|| parts.join("\n"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn test_info_output() {
        let output = CommandOutput::info("Hello, world!");
        assert!(matches!(&output, CommandOutput::Info(s) if s == "Hello, world!"));
        assert_eq!(output.render_text().as_deref(), Some("Hello, world!"));
    }

    #[test]
    fn test_table_output() {
        let output = CommandOutput::table(
            vec!["id".to_string(), "name".to_string()],
            vec![vec!["1".to_string(), "Ada".to_string()]],
        );
        assert_eq!(output.render_text().unwrap(), "id | name\n---+-----\n1  | Ada");
    }

    #[test]
    fn test_answer_success_render() {
        let output = CommandOutput::Answer(QueryResult::success(
            "There are 3 orders.",
            Duration::from_millis(420),
        ));
        assert_eq!(
            output.render_text().unwrap(),
            "Result:\nThere are 3 orders.\n\nQuery completed in 0.42 seconds\n-----------\n\
             /help  - Display this help message"
        );
    }

    #[test]
    fn test_answer_failure_render() {
        let output =
            CommandOutput::Answer(QueryResult::failure("LLM error: down", Duration::ZERO));
        let text = output.render_text().unwrap();
        assert!(text.starts_with("Result:\nError: LLM error: down\n"));
        assert!(text.contains("Query completed in 0.00 seconds"));
    }

    #[test]
    fn test_exit_detection() {
        assert!(CommandOutput::exit().is_exit());
        assert!(CommandOutput::multiple(vec![CommandOutput::info("Exiting..."), CommandOutput::exit()])
            .is_exit());
        assert!(!CommandOutput::info("hi").is_exit());
    }

    #[test]
    fn test_multiple_skips_silent_outputs() {
        let output = CommandOutput::multiple(vec![
            CommandOutput::info("Exiting..."),
            CommandOutput::exit(),
        ]);
        assert_eq!(output.render_text().as_deref(), Some("Exiting..."));
        assert_eq!(CommandOutput::None.render_text(), None);
        assert_eq!(CommandOutput::multiple(vec![]).render_text(), None);
    }
}
