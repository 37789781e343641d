//! PostgreSQL database client.
//!
//! The pool is created lazily: no connection is opened until the first
//! statement runs, so startup connectivity is decided by the probe.
//!
//! Every session is opened with `default_transaction_read_only=on`, so the
//! server refuses writes even when a statement gets past the SQL guard.

use crate::config::ConnectionConfig;
use crate::db::decode::convert_row;
use crate::db::{Column, ColumnInfo, DatabaseClient, ForeignKey, Index, Row, RowSet, Schema, Table};
use crate::error::{Result, Txt2SqlError};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Column as SqlxColumn, Executor, Row as _, Statement, TypeInfo};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 30;

/// Maximum rows to return from an arbitrary query.
pub const MAX_ROWS: usize = 1000;

/// Maximum pooled connections.
const MAX_CONNECTIONS: u32 = 5;

/// Pool acquire timeout; bounds how long an unreachable host can stall a call.
const ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL database client backed by a sqlx pool.
#[derive(Debug)]
pub struct PostgresClient {
    pool: PgPool,
    config: ConnectionConfig,
}

impl PostgresClient {
    /// Creates a client with a lazily connected pool.
    ///
    /// Only fails if the connection descriptor cannot be turned into a valid
    /// connection string; reachability is checked later by [`DatabaseClient::probe`].
    pub fn connect_lazy(config: &ConnectionConfig) -> Result<Self> {
        let options = connect_options(config)?;

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_lazy_with(options);

        debug!(database = %config.display_string(), "Created lazy connection pool");

        Ok(Self {
            pool,
            config: config.clone(),
        })
    }

    /// Column metadata for a statement that returned no rows.
    async fn describe_columns(&self, sql: &str) -> Vec<ColumnInfo> {
        match (&self.pool).prepare(sql).await {
            Ok(statement) => statement
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            Err(e) => {
                debug!(error = %e, "Could not describe empty result");
                Vec::new()
            }
        }
    }

    async fn fetch_tables(&self) -> Result<Vec<Table>> {
        let table_names: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT table_name::text
            FROM information_schema.tables
            WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| catalog_error("tables", e))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for table_name in table_names {
            let columns = self.fetch_columns(&table_name).await?;
            let primary_key = self.fetch_primary_key(&table_name).await?;
            let indexes = self.fetch_indexes(&table_name).await?;

            tables.push(Table {
                name: table_name,
                columns,
                primary_key,
                indexes,
            });
        }

        Ok(tables)
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<Column>> {
        let rows: Vec<(String, String, bool, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                a.attname::text,
                format_type(a.atttypid, a.atttypmod),
                NOT a.attnotnull,
                pg_get_expr(d.adbin, d.adrelid)
            FROM pg_attribute a
            JOIN pg_class c ON c.oid = a.attrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            LEFT JOIN pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
            WHERE n.nspname = 'public'
                AND c.relname = $1
                AND a.attnum > 0
                AND NOT a.attisdropped
            ORDER BY a.attnum
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| catalog_error(&format!("columns for {table_name}"), e))?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default)| Column {
                name,
                data_type,
                is_nullable,
                default,
            })
            .collect())
    }

    async fn fetch_primary_key(&self, table_name: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(
            r#"
            SELECT kcu.column_name::text
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = 'public'
                AND tc.table_name = $1
                AND tc.constraint_type = 'PRIMARY KEY'
            ORDER BY kcu.ordinal_position
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| catalog_error(&format!("primary key for {table_name}"), e))
    }

    async fn fetch_indexes(&self, table_name: &str) -> Result<Vec<Index>> {
        let rows: Vec<(String, String, bool)> = sqlx::query_as(
            r#"
            SELECT
                i.relname::text AS index_name,
                a.attname::text AS column_name,
                ix.indisunique AS is_unique
            FROM pg_index ix
            JOIN pg_class t ON t.oid = ix.indrelid
            JOIN pg_class i ON i.oid = ix.indexrelid
            JOIN pg_namespace n ON n.oid = t.relnamespace
            CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
            JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
            WHERE n.nspname = 'public'
                AND t.relname = $1
                AND NOT ix.indisprimary
            ORDER BY i.relname, k.ord
            "#,
        )
        .bind(table_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| catalog_error(&format!("indexes for {table_name}"), e))?;

        let mut indexes: Vec<Index> = Vec::new();
        for (index_name, column_name, is_unique) in rows {
            match indexes.last_mut() {
                Some(current) if current.name == index_name => current.columns.push(column_name),
                _ => indexes.push(Index::new(index_name, vec![column_name]).unique(is_unique)),
            }
        }

        Ok(indexes)
    }

    async fn fetch_foreign_keys(&self) -> Result<Vec<ForeignKey>> {
        let rows: Vec<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                con.conname::text AS constraint_name,
                src.relname::text AS from_table,
                sa.attname::text AS from_column,
                tgt.relname::text AS to_table,
                ta.attname::text AS to_column
            FROM pg_constraint con
            JOIN pg_class src ON src.oid = con.conrelid
            JOIN pg_namespace n ON n.oid = src.relnamespace
            JOIN pg_class tgt ON tgt.oid = con.confrelid
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(src_attnum, tgt_attnum, ord)
            JOIN pg_attribute sa ON sa.attrelid = con.conrelid AND sa.attnum = k.src_attnum
            JOIN pg_attribute ta ON ta.attrelid = con.confrelid AND ta.attnum = k.tgt_attnum
            WHERE con.contype = 'f' AND n.nspname = 'public'
            ORDER BY src.relname, con.conname, k.ord
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| catalog_error("foreign keys", e))?;

        Ok(group_foreign_keys(rows))
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    async fn introspect_schema(&self) -> Result<Schema> {
        let start = Instant::now();
        let tables = self.fetch_tables().await?;
        let foreign_keys = self.fetch_foreign_keys().await?;

        debug!(
            tables = tables.len(),
            foreign_keys = foreign_keys.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Introspected schema"
        );

        Ok(Schema {
            tables,
            foreign_keys,
        })
    }

    async fn execute_query(&self, sql: &str) -> Result<RowSet> {
        let start = Instant::now();

        let result = tokio::time::timeout(
            Duration::from_secs(QUERY_TIMEOUT_SECS),
            sqlx::query(sql).fetch_all(&self.pool),
        )
        .await
        .map_err(|_| {
            Txt2SqlError::query(format!(
                "Query timed out after {QUERY_TIMEOUT_SECS} seconds"
            ))
        })?
        .map_err(|e| match e {
            e if is_connection_failure(&e) => map_connection_error(e, &self.config),
            e => Txt2SqlError::query(format_query_error(e)),
        })?;

        let execution_time = start.elapsed();

        let columns: Vec<ColumnInfo> = match result.first() {
            Some(first_row) => first_row
                .columns()
                .iter()
                .map(|col| ColumnInfo::new(col.name(), col.type_info().name()))
                .collect(),
            None => self.describe_columns(sql).await,
        };

        let total_rows = result.len();
        let was_truncated = total_rows > MAX_ROWS;
        if was_truncated {
            warn!(total_rows, max_rows = MAX_ROWS, "Truncating query result");
        }

        let rows: Vec<Row> = result.iter().take(MAX_ROWS).map(convert_row).collect();

        debug!(
            rows = rows.len(),
            duration_ms = execution_time.as_millis() as u64,
            "Executed query"
        );

        Ok(RowSet {
            columns,
            rows,
            execution_time,
            was_truncated,
        })
    }

    async fn probe(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| map_connection_error(e, &self.config))
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

/// Connection options with read-only sessions.
fn connect_options(config: &ConnectionConfig) -> Result<PgConnectOptions> {
    let conn_str = config.to_connection_string()?;
    let options: PgConnectOptions = conn_str
        .parse()
        .map_err(|e| map_connection_error(e, config))?;

    Ok(options.options([("default_transaction_read_only", "on")]))
}

/// Groups per-column foreign-key rows into constraints, keeping column order.
fn group_foreign_keys(rows: Vec<(String, String, String, String, String)>) -> Vec<ForeignKey> {
    let mut foreign_keys: Vec<ForeignKey> = Vec::new();

    for (name, from_table, from_column, to_table, to_column) in rows {
        match foreign_keys.last_mut() {
            Some(current) if current.name == name && current.from_table == from_table => {
                current.from_columns.push(from_column);
                current.to_columns.push(to_column);
            }
            _ => foreign_keys.push(ForeignKey::new(
                name,
                from_table,
                vec![from_column],
                to_table,
                vec![to_column],
            )),
        }
    }

    foreign_keys
}

/// Errors that mean the server was never reached or the pool is unusable.
fn is_connection_failure(error: &sqlx::Error) -> bool {
    matches!(
        error,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Configuration(_)
    )
}

fn catalog_error(what: &str, error: sqlx::Error) -> Txt2SqlError {
    if is_connection_failure(&error) {
        Txt2SqlError::connection(format!("Failed to fetch {what}: {error}"))
    } else {
        Txt2SqlError::query(format!("Failed to fetch {what}: {error}"))
    }
}

/// Maps sqlx connection errors to user-facing messages.
fn map_connection_error(error: sqlx::Error, config: &ConnectionConfig) -> Txt2SqlError {
    let host = &config.host;
    let port = config.port;
    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        Txt2SqlError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        Txt2SqlError::connection(format!(
            "Authentication failed for user '{}'. Check your credentials.",
            config.user
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        Txt2SqlError::connection(format!("Database '{}' does not exist.", config.database))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        Txt2SqlError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        Txt2SqlError::connection(error.to_string())
    }
}

/// Formats a query error, appending Postgres detail and hint when present.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = format!("ERROR: {}", db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }
        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            host: "db.example".to_string(),
            port: 5433,
            database: "shop".to_string(),
            user: "reader".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_group_foreign_keys_keeps_column_order() {
        let rows = vec![
            (
                "line_items_order_fkey".to_string(),
                "line_items".to_string(),
                "order_id".to_string(),
                "orders".to_string(),
                "id".to_string(),
            ),
            (
                "line_items_order_fkey".to_string(),
                "line_items".to_string(),
                "order_rev".to_string(),
                "orders".to_string(),
                "rev".to_string(),
            ),
            (
                "orders_user_id_fkey".to_string(),
                "orders".to_string(),
                "user_id".to_string(),
                "users".to_string(),
                "id".to_string(),
            ),
        ];

        let fks = group_foreign_keys(rows);

        assert_eq!(fks.len(), 2);
        assert_eq!(fks[0].name, "line_items_order_fkey");
        assert_eq!(fks[0].from_columns, vec!["order_id", "order_rev"]);
        assert_eq!(fks[0].to_columns, vec!["id", "rev"]);
        assert_eq!(fks[1].to_string(), "orders(user_id) -> users(id)");
    }

    #[test]
    fn test_two_constraints_between_same_tables_stay_separate() {
        let row = |name: &str, col: &str| {
            (
                name.to_string(),
                "transfers".to_string(),
                col.to_string(),
                "accounts".to_string(),
                "id".to_string(),
            )
        };
        let fks = group_foreign_keys(vec![
            row("transfers_from_fkey", "from_account"),
            row("transfers_to_fkey", "to_account"),
        ]);

        assert_eq!(fks.len(), 2);
        assert_eq!(fks[0].from_columns, vec!["from_account"]);
        assert_eq!(fks[1].from_columns, vec!["to_account"]);
    }

    #[test]
    fn test_map_connection_error_timeout() {
        let err = map_connection_error(sqlx::Error::PoolTimedOut, &config());
        assert!(matches!(err, Txt2SqlError::Connection(_)));
        assert!(err.to_string().contains("db.example:5433 timed out"));
    }

    #[test]
    fn test_map_connection_error_fallback() {
        let err = map_connection_error(sqlx::Error::PoolClosed, &config());
        assert!(matches!(err, Txt2SqlError::Connection(_)));
    }

    #[test]
    fn test_catalog_error_categories() {
        assert!(matches!(
            catalog_error("tables", sqlx::Error::PoolTimedOut),
            Txt2SqlError::Connection(_)
        ));
        assert!(matches!(
            catalog_error("tables", sqlx::Error::RowNotFound),
            Txt2SqlError::Query(_)
        ));
    }

    #[test]
    fn test_format_query_error_non_database() {
        assert_eq!(
            format_query_error(sqlx::Error::RowNotFound),
            sqlx::Error::RowNotFound.to_string()
        );
    }

    #[test]
    fn test_connect_options_make_sessions_read_only() {
        let options = connect_options(&config()).unwrap();

        assert_eq!(options.get_host(), "db.example");
        assert_eq!(options.get_port(), 5433);
        assert!(options
            .get_options()
            .is_some_and(|o| o.contains("default_transaction_read_only=on")));
    }

    #[tokio::test]
    async fn test_connect_lazy_does_not_touch_network() {
        let client = PostgresClient::connect_lazy(&config());
        assert!(client.is_ok());
    }
}
