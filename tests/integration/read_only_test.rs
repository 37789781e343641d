//! The server itself refuses writes from txt2sql sessions.

use txt2sql::db::{DatabaseClient, Value};
use txt2sql::error::Txt2SqlError;

use super::get_test_client;

#[tokio::test]
async fn test_setval_is_refused_by_the_server() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let before = client
        .execute_query("SELECT last_value FROM orders_id_seq")
        .await
        .unwrap();

    let err = client
        .execute_query("SELECT setval('orders_id_seq', 424242)")
        .await
        .unwrap_err();
    assert!(matches!(err, Txt2SqlError::Query(_)));
    assert!(err.to_string().contains("read-only transaction"));

    let after = client
        .execute_query("SELECT last_value FROM orders_id_seq")
        .await
        .unwrap();
    assert_eq!(before.rows, after.rows);
    assert_ne!(after.rows[0][0], Value::Int(424242));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_insert_is_refused_by_the_server() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let err = client
        .execute_query("INSERT INTO audit_log (message) VALUES ('should not land')")
        .await
        .unwrap_err();
    assert!(matches!(err, Txt2SqlError::Query(_)));

    let rows = client.execute_query("SELECT count(*) FROM audit_log").await.unwrap();
    assert_eq!(rows.rows[0][0], Value::Int(0));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_sessions_default_to_read_only() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let rows = client
        .execute_query("SELECT current_setting('default_transaction_read_only')")
        .await
        .unwrap();

    assert_eq!(rows.rows[0][0], Value::String("on".to_string()));

    client.close().await.unwrap();
}
