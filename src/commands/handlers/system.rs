//! System command handlers (/help, /exit, usage errors).

use crate::commands::help::HELP_TEXT;
use crate::commands::output::CommandOutput;

/// Handle /help command.
pub fn handle_help() -> CommandOutput {
    CommandOutput::info(HELP_TEXT)
}

/// Handle /exit or /quit command.
pub fn handle_exit() -> CommandOutput {
    CommandOutput::multiple(vec![CommandOutput::info("Exiting..."), CommandOutput::exit()])
}

/// Handle a command given without its argument.
pub fn handle_usage(usage: &str) -> CommandOutput {
    CommandOutput::error(usage)
}
