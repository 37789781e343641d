//! End-to-end front-end tests over the seeded in-memory database and the mock
//! model provider.

pub mod dashboard_test;
pub mod repl_test;

use std::collections::HashMap;
use txt2sql::app::{App, DatabaseSource};
use txt2sql::config::{Config, REQUIRED_VARS};

/// A complete set of required settings.
pub fn test_env() -> HashMap<&'static str, String> {
    let mut vars: HashMap<&'static str, String> = REQUIRED_VARS
        .iter()
        .map(|name| (*name, "test".to_string()))
        .collect();
    vars.insert("DB_PORT", "5432".to_string());
    vars
}

/// Configuration selecting the mock model provider.
pub fn mock_config() -> Config {
    let mut config = Config::default();
    config.llm.provider = "mock".to_string();
    config
}

/// Starts the application against the seeded mock database.
pub async fn start_app(verbose: bool) -> App {
    let vars = test_env();
    App::initialize_with(
        |name| vars.get(name).cloned(),
        mock_config(),
        verbose,
        DatabaseSource::mock(),
    )
    .await
    .expect("mock app should start")
}
