//! In-memory database clients for tests and `--mock-db` demos.

use super::{Column, ColumnInfo, DatabaseClient, ForeignKey, Row, RowSet, Schema, Table, Value};
use crate::error::{Result, Txt2SqlError};
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// A table held by the mock: its catalog entry plus its rows.
#[derive(Debug, Clone)]
struct MockTable {
    table: Table,
    rows: Vec<Row>,
}

/// In-memory database answering `SELECT 1` and `SELECT * FROM <t> [LIMIT n]`.
///
/// Every statement passed to [`DatabaseClient::execute_query`] is recorded
/// and can be inspected with [`MockDatabaseClient::executed`].
#[derive(Debug, Default)]
pub struct MockDatabaseClient {
    tables: Vec<MockTable>,
    foreign_keys: Vec<ForeignKey>,
    executed: Mutex<Vec<String>>,
}

impl MockDatabaseClient {
    /// Creates an empty mock database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table with rows. Tables are kept in name order.
    pub fn with_table(mut self, table: Table, rows: Vec<Row>) -> Self {
        self.tables.push(MockTable { table, rows });
        self.tables.sort_by(|a, b| a.table.name.cmp(&b.table.name));
        self
    }

    /// Adds a foreign key.
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// A small shop database: `users`, `orders` (3 rows), and `audit_log` (empty).
    pub fn seeded() -> Self {
        let users = Table::new("users")
            .with_column(Column::new("id", "integer").nullable(false))
            .with_column(Column::new("name", "text").nullable(false))
            .with_column(Column::new("email", "text"))
            .with_primary_key(["id"]);
        let orders = Table::new("orders")
            .with_column(Column::new("id", "integer").nullable(false))
            .with_column(Column::new("user_id", "integer").nullable(false))
            .with_column(Column::new("total", "numeric(10,2)").nullable(false))
            .with_column(
                Column::new("status", "text")
                    .nullable(false)
                    .with_default("'pending'::text"),
            )
            .with_primary_key(["id"]);
        let audit_log = Table::new("audit_log")
            .with_column(Column::new("id", "bigint").nullable(false))
            .with_column(Column::new("message", "text"))
            .with_primary_key(["id"]);

        Self::new()
            .with_table(
                users,
                vec![
                    vec![Value::Int(1), "Ada".into(), "ada@example.com".into()],
                    vec![Value::Int(2), "Grace".into(), Value::Null],
                ],
            )
            .with_table(
                orders,
                vec![
                    vec![Value::Int(1), Value::Int(1), "120.50".into(), "shipped".into()],
                    vec![Value::Int(2), Value::Int(1), "35.00".into(), "pending".into()],
                    vec![Value::Int(3), Value::Int(2), "99.99".into(), "shipped".into()],
                ],
            )
            .with_table(audit_log, Vec::new())
            .with_foreign_key(ForeignKey::new(
                "orders_user_id_fkey",
                "orders",
                vec!["user_id".to_string()],
                "users",
                vec!["id".to_string()],
            ))
    }

    /// Statements executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn record(&self, sql: &str) {
        if let Ok(mut log) = self.executed.lock() {
            log.push(sql.to_string());
        }
    }

    fn select_all(&self, table_name: &str, limit: Option<usize>) -> Result<RowSet> {
        let mock = self
            .tables
            .iter()
            .find(|t| t.table.name == table_name)
            .ok_or_else(|| {
                Txt2SqlError::query(format!(
                    "ERROR: relation \"{table_name}\" does not exist"
                ))
            })?;

        let columns = mock
            .table
            .columns
            .iter()
            .map(|c| ColumnInfo::new(&c.name, &c.data_type))
            .collect();
        let rows = mock
            .rows
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect();

        Ok(RowSet::with_data(columns, rows).with_execution_time(Duration::from_millis(1)))
    }
}

/// Parsed form of the few statements the mock understands.
#[derive(Debug, PartialEq)]
enum MockStatement {
    SelectOne,
    SelectAll { table: String, limit: Option<usize> },
}

fn parse_mock_statement(sql: &str) -> Option<MockStatement> {
    let sql = sql.trim().trim_end_matches(';').trim();
    let words: Vec<&str> = sql.split_whitespace().collect();

    match words.as_slice() {
        [select, one] if select.eq_ignore_ascii_case("SELECT") && *one == "1" => {
            return Some(MockStatement::SelectOne);
        }
        [select, star, from, ..]
            if select.eq_ignore_ascii_case("SELECT")
                && *star == "*"
                && from.eq_ignore_ascii_case("FROM") => {}
        _ => return None,
    }

    // Skip the three leading keywords, then read the table identifier.
    let mut remaining = sql;
    for _ in 0..3 {
        let trimmed = remaining.trim_start();
        let end = trimmed.find(char::is_whitespace)?;
        remaining = &trimmed[end..];
    }
    let (table, rest) = split_identifier(remaining.trim_start())?;

    let limit = match rest.split_whitespace().collect::<Vec<_>>().as_slice() {
        [] => None,
        [limit, n] if limit.eq_ignore_ascii_case("LIMIT") => Some(n.parse().ok()?),
        _ => return None,
    };

    Some(MockStatement::SelectAll { table, limit })
}

/// Reads a bare identifier (folded to lower case) or a double-quoted one from
/// the front of `input`, returning it with the unread remainder.
fn split_identifier(input: &str) -> Option<(String, &str)> {
    let Some(quoted) = input.strip_prefix('"') else {
        let end = input.find(char::is_whitespace).unwrap_or(input.len());
        let name = &input[..end];
        if name.is_empty() || name.contains('"') {
            return None;
        }
        return Some((name.to_lowercase(), &input[end..]));
    };

    let mut name = String::new();
    let mut chars = quoted.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '"' {
            name.push(c);
            continue;
        }
        if matches!(chars.peek(), Some((_, '"'))) {
            chars.next();
            name.push('"');
        } else {
            return Some((name, &quoted[i + 1..]));
        }
    }
    None
}

#[async_trait]
impl DatabaseClient for MockDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Ok(Schema {
            tables: self.tables.iter().map(|t| t.table.clone()).collect(),
            foreign_keys: self.foreign_keys.clone(),
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<RowSet> {
        self.record(sql);

        match parse_mock_statement(sql) {
            Some(MockStatement::SelectOne) => Ok(RowSet::with_data(
                vec![ColumnInfo::new("?column?", "INT4")],
                vec![vec![Value::Int(1)]],
            )),
            Some(MockStatement::SelectAll { table, limit }) => self.select_all(&table, limit),
            None => Err(Txt2SqlError::query(format!(
                "Mock database cannot run statement: {sql}"
            ))),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Database client whose every call fails with a connection error.
#[derive(Debug, Clone)]
pub struct FailingDatabaseClient {
    message: String,
}

impl FailingDatabaseClient {
    /// Creates a client failing with a generic message.
    pub fn new() -> Self {
        Self::with_message("Cannot connect to database")
    }

    /// Creates a client failing with the given message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    fn error(&self) -> Txt2SqlError {
        Txt2SqlError::connection(self.message.clone())
    }
}

impl Default for FailingDatabaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DatabaseClient for FailingDatabaseClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        Err(self.error())
    }

    async fn execute_query(&self, _sql: &str) -> Result<RowSet> {
        Err(self.error())
    }

    async fn probe(&self) -> Result<()> {
        Err(self.error())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
