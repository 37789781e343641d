//! PostgreSQL-backed integration tests.
//!
//! These tests require a running PostgreSQL database.
//! Set DATABASE_URL environment variable to run them; `fixtures/seed.sql` is
//! applied once before the first test connects.

pub mod read_only_test;
pub mod sample_test;
pub mod schema_test;

use sqlx::postgres::PgPoolOptions;
use tokio::sync::OnceCell;
use txt2sql::config::ConnectionConfig;
use txt2sql::db::PostgresClient;

const SEED: &str = include_str!("../fixtures/seed.sql");

static SEEDED: OnceCell<bool> = OnceCell::const_new();

/// Helper to get test database URL from environment.
fn get_test_database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

async fn seed(url: &str) -> bool {
    let pool = match PgPoolOptions::new().max_connections(1).connect(url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Could not connect to seed test database: {e}");
            return false;
        }
    };
    let result = sqlx::raw_sql(SEED).execute(&pool).await;
    pool.close().await;
    match result {
        Ok(_) => true,
        Err(e) => {
            eprintln!("Seeding test database failed: {e}");
            false
        }
    }
}

/// Helper to create a test client over the seeded database.
pub async fn get_test_client() -> Option<PostgresClient> {
    let url = get_test_database_url()?;
    if !*SEEDED.get_or_init(|| seed(&url)).await {
        return None;
    }
    let config = ConnectionConfig::from_connection_string(&url).ok()?;
    PostgresClient::connect_lazy(&config).ok()
}
