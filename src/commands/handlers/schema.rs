//! Schema command handlers (/tables, /sample).

use tracing::warn;

use super::CommandContext;
use crate::commands::output::CommandOutput;

/// Handle /tables command.
pub async fn handle_tables(ctx: &CommandContext<'_>) -> CommandOutput {
    match ctx.agent.inspector().table_names().await {
        Ok(tables) if tables.is_empty() => {
            CommandOutput::info("Database Tables:\n(no tables found)")
        }
        Ok(tables) => {
            let lines: Vec<String> = tables.iter().map(|t| format!("- {t}")).collect();
            CommandOutput::info(format!("Database Tables:\n{}", lines.join("\n")))
        }
        Err(e) => {
            warn!(error = %e, "Listing tables failed");
            CommandOutput::error(format!("Error retrieving tables: {e}"))
        }
    }
}

/// Handle /sample command.
pub async fn handle_sample(ctx: &CommandContext<'_>, table: &str) -> CommandOutput {
    match ctx.agent.inspector().sample_rows(table, ctx.sample_limit).await {
        Ok(rows) => CommandOutput::multiple(vec![
            CommandOutput::info(format!("Sample data from {table}:")),
            CommandOutput::table(rows.column_names(), rows.display_rows(None)),
        ]),
        Err(e) => {
            warn!(table, error = %e, "Sampling table failed");
            CommandOutput::error(format!("Error retrieving sample data: {e}"))
        }
    }
}
