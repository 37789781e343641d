//! Schema inspection and sample-row access.

use super::{DatabaseClient, RowSet, Schema};
use crate::error::{Result, Txt2SqlError};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Default number of rows returned by [`SchemaInspector::sample_rows`].
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Read-only view over a database: catalog snapshots, sample rows and a
/// connectivity check. Nothing is cached; every call goes to the database.
#[derive(Clone)]
pub struct SchemaInspector {
    db: Arc<dyn DatabaseClient>,
}

impl SchemaInspector {
    /// Wraps a shared database client.
    pub fn new(db: Arc<dyn DatabaseClient>) -> Self {
        Self { db }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Arc<dyn DatabaseClient> {
        &self.db
    }

    /// Takes a fresh snapshot of the `public` schema.
    pub async fn describe_schema(&self) -> Result<Schema> {
        let start = Instant::now();
        let schema = self.db.introspect_schema().await?;
        debug!(
            tables = schema.tables.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Described schema"
        );
        Ok(schema)
    }

    /// Table names in catalog order.
    pub async fn table_names(&self) -> Result<Vec<String>> {
        Ok(self.describe_schema().await?.table_names())
    }

    /// Returns up to `limit` rows of `table_name`.
    ///
    /// The name must match a table of the current schema exactly; otherwise a
    /// query error is returned and no statement is sent.
    pub async fn sample_rows(&self, table_name: &str, limit: usize) -> Result<RowSet> {
        let schema = self.describe_schema().await?;
        if !schema.contains_table(table_name) {
            return Err(Txt2SqlError::query(format!("Unknown table '{table_name}'")));
        }

        let sql = format!(
            "SELECT * FROM {} LIMIT {limit}",
            quote_identifier(table_name)
        );
        debug!(table = table_name, limit, "Sampling rows");

        self.db.execute_query(&sql).await
    }

    /// Returns true if the probe succeeds. Failures are logged, never raised.
    pub async fn check_connection(&self) -> bool {
        match self.db.probe().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Database connection check failed");
                false
            }
        }
    }
}

/// Quotes a SQL identifier, doubling embedded double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
