//! Database access for txt2sql.
//!
//! A trait-based client interface with a PostgreSQL implementation and
//! in-memory mocks, plus the [`SchemaInspector`] used by the front-ends and
//! the query agent.

mod decode;
mod inspector;
mod mock;
mod postgres;
mod schema;
mod types;

pub use inspector::{quote_identifier, SchemaInspector, DEFAULT_SAMPLE_LIMIT};
pub use mock::{FailingDatabaseClient, MockDatabaseClient};
pub use postgres::{PostgresClient, MAX_ROWS};
pub use schema::{Column, ForeignKey, Index, Schema, Table};
pub use types::{format_table, ColumnInfo, Row, RowSet, Value};

use crate::config::ConnectionConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Creates a PostgreSQL client for the given connection descriptor.
///
/// The pool is lazy; call [`SchemaInspector::check_connection`] to find out
/// whether the server is actually reachable.
pub async fn connect(config: &ConnectionConfig) -> Result<Arc<dyn DatabaseClient>> {
    let client = PostgresClient::connect_lazy(config)?;
    Ok(Arc::new(client))
}

/// Interface for database clients.
#[async_trait]
pub trait DatabaseClient: Send + Sync {
    /// Reads tables, columns, keys and indexes from the catalog.
    async fn introspect_schema(&self) -> Result<Schema>;

    /// Executes a SQL statement and returns its rows.
    async fn execute_query(&self, sql: &str) -> Result<RowSet>;

    /// Runs the connectivity probe `SELECT 1`.
    async fn probe(&self) -> Result<()> {
        self.execute_query("SELECT 1").await.map(|_| ())
    }

    /// Closes the underlying connections.
    async fn close(&self) -> Result<()>;
}
