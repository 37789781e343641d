//! Startup wiring shared by the REPL and the dashboard.
//!
//! Settings are read first, then the model client is built, then the
//! database is connected and probed. Any failure stops startup before a
//! front-end runs.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::agent::{LoopOptions, QueryAgent};
use crate::commands::CommandContext;
use crate::config::{Config, Settings};
use crate::dashboard::{DashboardState, SharedState};
use crate::db::{self, DatabaseClient, MockDatabaseClient, SchemaInspector};
use crate::error::{Result, Txt2SqlError};
use crate::llm::{create_client, load_prompt_prefix};

/// Message used when the connectivity probe fails.
pub const CONNECTION_FAILED: &str =
    "Could not connect to the database. Please check your connection settings.";

/// Where the database client comes from.
pub enum DatabaseSource {
    /// A lazily connected PostgreSQL pool built from the settings.
    Postgres,
    /// An already built client, e.g. the seeded in-memory mock.
    Client(Arc<dyn DatabaseClient>),
}

impl DatabaseSource {
    /// The seeded in-memory demo database.
    pub fn mock() -> Self {
        Self::Client(Arc::new(MockDatabaseClient::seeded()))
    }
}

/// A started application: settings, configuration and the shared agent.
pub struct App {
    pub settings: Settings,
    pub config: Config,
    pub agent: Arc<QueryAgent>,
}

impl App {
    /// Starts against PostgreSQL using settings from `lookup`.
    pub async fn initialize<F>(lookup: F, config: Config, verbose: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::initialize_with(lookup, config, verbose, DatabaseSource::Postgres).await
    }

    /// Starts with an explicit database source.
    pub async fn initialize_with<F>(
        lookup: F,
        config: Config,
        verbose: bool,
        source: DatabaseSource,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Settings::from_lookup(lookup)?;
        info!(
            database = %settings.connection.display_string(),
            model = %settings.model,
            "Settings loaded"
        );

        let llm = create_client(&config.llm, &settings)?;

        let db = match source {
            DatabaseSource::Postgres => db::connect(&settings.connection).await?,
            DatabaseSource::Client(client) => client,
        };

        if !SchemaInspector::new(db.clone()).check_connection().await {
            warn!(database = %settings.connection.display_string(), "Database probe failed");
            return Err(Txt2SqlError::connection(CONNECTION_FAILED));
        }
        info!("Database connected");

        let prefix = load_prompt_prefix(config.agent.system_prompt_path.as_deref())?;
        let options = LoopOptions {
            verbose,
            ..LoopOptions::from(&config.agent)
        };
        let agent = Arc::new(QueryAgent::new(db, llm, prefix, options));

        Ok(Self {
            settings,
            config,
            agent,
        })
    }

    /// Handler context for the REPL.
    pub fn command_context(&self) -> CommandContext<'_> {
        CommandContext::new(&self.agent).with_sample_limit(self.config.agent.sample_limit)
    }

    /// Shared state for the dashboard.
    pub fn dashboard_state(&self) -> SharedState {
        Arc::new(
            DashboardState::new(self.agent.clone())
                .with_sample_limit(self.config.agent.sample_limit)
                .with_session_ttl(Duration::from_secs(self.config.dashboard.session_ttl_secs)),
        )
    }
}

/// The line printed when startup fails.
pub fn startup_error_message(error: &Txt2SqlError) -> String {
    match error {
        Txt2SqlError::Connection(msg) if msg == CONNECTION_FAILED => format!("Error: {msg}"),
        other => format!("Error initializing txt2sql agent: {other}"),
    }
}
