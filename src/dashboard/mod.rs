//! Browser dashboard served with axum.
//!
//! One shared [`QueryAgent`] serves every session; per-session choices live
//! in a [`SessionStore`].

pub mod handlers;
pub mod page;
pub mod session;

pub use page::{escape_html, EXAMPLE_QUESTIONS};
pub use session::{SessionState, SessionStore, SESSION_COOKIE};

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

use crate::agent::QueryAgent;
use crate::db::DEFAULT_SAMPLE_LIMIT;
use crate::error::{Result, Txt2SqlError};

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:8501";

/// State shared by all handlers.
pub struct DashboardState {
    pub agent: Arc<QueryAgent>,
    pub sessions: SessionStore,
    pub sample_limit: usize,
}

impl DashboardState {
    pub fn new(agent: Arc<QueryAgent>) -> Self {
        Self {
            agent,
            sessions: SessionStore::new(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }

    pub fn with_sample_limit(mut self, sample_limit: usize) -> Self {
        self.sample_limit = sample_limit;
        self
    }

    /// Replaces the session store with one that forgets sessions idle for `ttl`.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionStore::with_ttl(ttl);
        self
    }
}

pub type SharedState = Arc<DashboardState>;

/// Builds the dashboard routes.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/tables/select", post(handlers::select_table))
        .route("/tables/sample", post(handlers::show_sample))
        .route("/examples/{index}", post(handlers::choose_example))
        .route("/query", post(handlers::run_query))
        .route("/healthz", get(handlers::healthz))
        .with_state(state)
}

/// Serves the dashboard on `bind` until SIGINT or SIGTERM.
pub async fn serve(state: SharedState, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| Txt2SqlError::internal(format!("Failed to bind to {bind}: {e}")))?;
    info!(bind, "Dashboard listening on http://{bind}");

    let agent = state.agent.clone();
    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(wait_for_signal())
        .await;

    if let Err(e) = agent.inspector().client().close().await {
        error!(error = %e, "Closing database connections failed");
    }

    match result {
        Ok(()) => {
            info!("Dashboard stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Dashboard server error");
            Err(Txt2SqlError::internal(format!("Dashboard server error: {e}")))
        }
    }
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
