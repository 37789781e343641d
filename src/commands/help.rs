//! Help text constants for txt2sql commands.

/// Help text displayed for the /help command.
pub const HELP_TEXT: &str = r#"Available commands:
  /help           - Display this help message
  /exit           - Exit the application
  /tables         - List database tables
  /sample TABLE   - Show sample data from a table
  /sql            - Generate SQL without executing it
  /explain QUERY  - Explain what a SQL query does
  Any other input will be treated as a natural language query to the database"#;

/// Reminder printed after each answered question.
pub const HELP_HINT: &str = "/help  - Display this help message";
