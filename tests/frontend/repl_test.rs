//! REPL sessions driven from an in-memory script.

use pretty_assertions::assert_eq;
use txt2sql::commands::repl::PROMPT;
use txt2sql::commands::Repl;

use super::start_app;

async fn run_session(input: &str) -> String {
    let app = start_app(true).await;
    let mut repl = Repl::new(app.command_context(), input.as_bytes(), Vec::new());
    repl.run().await.unwrap();
    String::from_utf8(repl.into_writer()).unwrap()
}

#[tokio::test]
async fn test_tables_and_exit() {
    let out = run_session("/tables\n/exit\n").await;

    assert!(out.starts_with("Database connected successfully.\n"));
    assert!(out.contains("\nDatabase Tables:\n- audit_log\n- orders\n- users\n"));
    assert!(out.ends_with("Exiting...\n"));
}

#[tokio::test]
async fn test_sample_orders_renders_three_rows() {
    let out = run_session("/sample orders\n/exit\n").await;

    assert!(out.contains("Sample data from orders:"));
    let header = out
        .lines()
        .find(|line| line.starts_with("id"))
        .expect("table header should be printed");
    let columns: Vec<&str> = header.split('|').map(str::trim).collect();
    assert_eq!(columns, vec!["id", "user_id", "total", "status"]);
    assert!(out.contains("120.50"));
    assert!(out.contains("35.00"));
    assert!(out.contains("99.99"));
}

#[tokio::test]
async fn test_sample_usage_and_unknown_table() {
    let out = run_session("/sample\n/sample nope\n/exit\n").await;

    assert!(out.contains("Usage: /sample TABLE"));
    assert!(out.contains("Error retrieving sample data: Query error: Unknown table 'nope'"));
}

#[tokio::test]
async fn test_generate_sql() {
    let out = run_session("/sql count the orders\n/exit\n").await;
    assert!(out.contains("Generated SQL:\nSELECT COUNT(*) FROM orders;"));
}

#[tokio::test]
async fn test_explain() {
    let out = run_session("/explain SELECT * FROM users\n/exit\n").await;
    assert!(out.contains("Explanation:\nThis query reads rows from the database"));
}

#[tokio::test]
async fn test_free_text_question_runs_the_tool_loop() {
    let out = run_session("show me the orders\n/exit\n").await;

    assert!(out.contains("Result:\nHere is what the database returned:"));
    assert!(out.contains("shipped"));
    assert!(out.contains("Query completed in "));
    assert!(out.contains(" seconds\n-----------\n"));
}

#[tokio::test]
async fn test_end_of_input_without_exit() {
    let out = run_session("/help").await;

    assert_eq!(out.matches("Available commands:").count(), 2);
    assert!(out.ends_with(&format!("{PROMPT}\n")));
}
