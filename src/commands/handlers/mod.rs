//! Command handlers for txt2sql.
//!
//! Each handler takes a command context and returns a [`CommandOutput`].
//! Failures are rendered as error outputs so front-ends always have
//! something to show.

pub mod agent;
pub mod schema;
pub mod system;

use crate::agent::QueryAgent;
use crate::commands::output::CommandOutput;
use crate::commands::router::Command;
use crate::db::DEFAULT_SAMPLE_LIMIT;

/// Context provided to command handlers.
pub struct CommandContext<'a> {
    /// The query agent, which also owns the schema inspector.
    pub agent: &'a QueryAgent,
    /// Rows shown by `/sample`.
    pub sample_limit: usize,
}

impl<'a> CommandContext<'a> {
    /// Creates a context with the default sample limit.
    pub fn new(agent: &'a QueryAgent) -> Self {
        Self {
            agent,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    /// Overrides the sample limit.
    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }
}

/// Dispatches a parsed command to its handler.
pub async fn dispatch(ctx: &CommandContext<'_>, command: Command) -> CommandOutput {
    match command {
        Command::Empty => CommandOutput::None,
        Command::Exit => system::handle_exit(),
        Command::Help => system::handle_help(),
        Command::Usage(usage) => system::handle_usage(usage),
        Command::Tables => schema::handle_tables(ctx).await,
        Command::Sample(table) => schema::handle_sample(ctx, &table).await,
        Command::GenerateSql(question) => agent::handle_generate_sql(ctx, &question).await,
        Command::Explain(sql) => agent::handle_explain(ctx, &sql).await,
        Command::Ask(question) => agent::handle_ask(ctx, &question).await,
    }
}
