//! Model-backed command handlers (/sql, /explain, free-text questions).

use tracing::warn;

use super::CommandContext;
use crate::commands::output::CommandOutput;

/// Handle /sql command.
pub async fn handle_generate_sql(ctx: &CommandContext<'_>, question: &str) -> CommandOutput {
    match ctx.agent.generate_sql(question).await {
        Ok(sql) => CommandOutput::Sql(sql),
        Err(e) => {
            warn!(error = %e, "SQL generation failed");
            CommandOutput::error(format!("Error generating SQL: {e}"))
        }
    }
}

/// Handle /explain command.
pub async fn handle_explain(ctx: &CommandContext<'_>, sql: &str) -> CommandOutput {
    match ctx.agent.explain(sql).await {
        Ok(explanation) => CommandOutput::info(format!("Explanation:\n{explanation}")),
        Err(e) => {
            warn!(error = %e, "Explanation failed");
            CommandOutput::error(format!("Error explaining query: {e}"))
        }
    }
}

/// Handle a natural language question.
pub async fn handle_ask(ctx: &CommandContext<'_>, question: &str) -> CommandOutput {
    CommandOutput::Answer(ctx.agent.answer(question).await)
}
