//! Sample-row access against a live PostgreSQL database.

use std::sync::Arc;
use txt2sql::db::{DatabaseClient, SchemaInspector, Value};
use txt2sql::error::Txt2SqlError;

use super::get_test_client;

async fn get_test_inspector() -> Option<SchemaInspector> {
    let client = get_test_client().await?;
    Some(SchemaInspector::new(Arc::new(client)))
}

#[tokio::test]
async fn test_sample_respects_limit() {
    let Some(inspector) = get_test_inspector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = inspector.sample_rows("orders", 2).await.unwrap();

    assert_eq!(rows.row_count(), 2);
    assert_eq!(rows.column_names(), vec!["id", "user_id", "total", "status"]);

    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_sample_returns_all_rows_below_limit() {
    let Some(inspector) = get_test_inspector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = inspector.sample_rows("users", 100).await.unwrap();

    assert!(rows.row_count() >= 2);
    assert!(rows.row_count() <= 100);

    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_sample_empty_table_keeps_columns() {
    let Some(inspector) = get_test_inspector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = inspector.sample_rows("audit_log", 5).await.unwrap();

    assert!(rows.is_empty());
    assert_eq!(rows.column_names(), vec!["id", "message"]);

    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_sample_unknown_table() {
    let Some(inspector) = get_test_inspector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = inspector
        .sample_rows("users; DROP TABLE users", 5)
        .await
        .unwrap_err();

    assert!(matches!(err, Txt2SqlError::Query(_)));
    assert!(inspector.describe_schema().await.unwrap().contains_table("users"));

    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_sample_decodes_numeric_and_timestamp_columns() {
    let Some(inspector) = get_test_inspector().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let orders = inspector.sample_rows("orders", 10).await.unwrap();
    let mut totals: Vec<String> = orders
        .display_rows(None)
        .into_iter()
        .map(|row| row[2].clone())
        .collect();
    totals.sort();
    assert_eq!(totals, vec!["120.50", "35.00", "99.99"]);

    let users = inspector.sample_rows("users", 10).await.unwrap();
    let created_at = users
        .column_names()
        .iter()
        .position(|name| name == "created_at")
        .unwrap();
    for row in &users.rows {
        assert!(!row[created_at].is_null());
        assert!(matches!(&row[created_at], Value::String(s) if s.starts_with("20")));
    }

    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_aggregate_over_numeric_keeps_scale() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = client
        .execute_query("SELECT sum(total) AS revenue, NULL::numeric AS missing FROM orders")
        .await
        .unwrap();

    assert_eq!(rows.rows[0][0], Value::String("255.49".to_string()));
    assert_eq!(rows.rows[0][1], Value::Null);

    client.close().await.unwrap();
}
