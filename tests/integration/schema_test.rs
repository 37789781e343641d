//! Schema introspection against a live PostgreSQL database.

use std::sync::Arc;
use txt2sql::db::{DatabaseClient, SchemaInspector};
use txt2sql::config::ConnectionConfig;

use super::get_test_client;

#[tokio::test]
async fn test_introspect_tables() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let schema = client.introspect_schema().await.unwrap();

    for name in ["users", "orders", "audit_log"] {
        assert!(
            schema.contains_table(name),
            "Expected '{name}' table to exist, got: {:?}",
            schema.table_names()
        );
    }

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_introspect_columns_in_catalog_order() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let schema = client.introspect_schema().await.unwrap();
    let orders = schema.table("orders").expect("orders table should exist");

    assert_eq!(orders.column_names(), vec!["id", "user_id", "total", "status"]);
    assert_eq!(orders.primary_key, vec!["id".to_string()]);

    let user_id = orders
        .columns
        .iter()
        .find(|c| c.name == "user_id")
        .expect("user_id column should exist");
    assert!(!user_id.is_nullable);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_introspect_foreign_keys() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let schema = client.introspect_schema().await.unwrap();

    let fk = schema
        .foreign_keys
        .iter()
        .find(|fk| fk.from_table == "orders" && fk.to_table == "users")
        .unwrap_or_else(|| panic!("Expected orders -> users, got: {:?}", schema.foreign_keys));

    assert_eq!(fk.from_columns, vec!["user_id".to_string()]);
    assert_eq!(fk.to_columns, vec!["id".to_string()]);

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_introspect_indexes() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let schema = client.introspect_schema().await.unwrap();
    let users = schema.table("users").expect("users table should exist");

    assert!(
        users
            .indexes
            .iter()
            .any(|idx| idx.is_unique && idx.columns == vec!["email".to_string()]),
        "Expected unique index on users.email, got: {:?}",
        users.indexes
    );

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_schema_format_for_llm() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let text = client.introspect_schema().await.unwrap().format_for_llm();

    assert!(text.contains("Table: users"));
    assert!(text.contains("Table: orders"));
    assert!(text.contains("FK -> users.id"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn test_check_connection() {
    let Some(client) = get_test_client().await else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };

    let inspector = SchemaInspector::new(Arc::new(client));
    assert!(inspector.check_connection().await);
    inspector.client().close().await.unwrap();
}

#[tokio::test]
async fn test_check_connection_unreachable_host() {
    let config = ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        database: "nowhere".to_string(),
        user: "nobody".to_string(),
        password: "secret".to_string(),
    };
    let client = txt2sql::db::connect(&config).await.unwrap();

    assert!(!SchemaInspector::new(client).check_connection().await);
}
