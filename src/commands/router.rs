//! Command parsing and routing for txt2sql.
//!
//! Parses user input into structured commands that can be dispatched to handlers.

/// Parsed command with arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Exit the application.
    Exit,
    /// Show help message.
    Help,
    /// List database tables.
    Tables,
    /// Show sample rows from a table.
    Sample(String),
    /// Generate SQL for a question without running it.
    GenerateSql(String),
    /// Explain a SQL statement.
    Explain(String),
    /// A command was given without its required argument.
    Usage(&'static str),
    /// Blank input.
    Empty,
    /// A natural language question for the agent.
    Ask(String),
}

/// Command router for parsing user input.
pub struct CommandRouter;

impl CommandRouter {
    /// Parse user input into a Command.
    ///
    /// The command word is matched case-insensitively; arguments keep their case.
    pub fn parse(input: &str) -> Command {
        let input = input.trim();

        if input.is_empty() {
            return Command::Empty;
        }

        if !input.starts_with('/') {
            return Command::Ask(input.to_string());
        }

        let (command, args) = match input.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (input, ""),
        };

        match command.to_lowercase().as_str() {
            "/exit" | "/quit" if args.is_empty() => Command::Exit,
            "/help" if args.is_empty() => Command::Help,
            "/tables" if args.is_empty() => Command::Tables,
            "/sample" => Self::with_arg(args, Command::Sample, "Usage: /sample TABLE"),
            "/sql" => Self::with_arg(args, Command::GenerateSql, "Usage: /sql QUESTION"),
            "/explain" => Self::with_arg(args, Command::Explain, "Usage: /explain QUERY"),
            _ => Command::Ask(input.to_string()),
        }
    }

    fn with_arg(args: &str, build: fn(String) -> Command, usage: &'static str) -> Command {
        if args.is_empty() {
            Command::Usage(usage)
        } else {
            build(args.to_string())
        }
    }
}
