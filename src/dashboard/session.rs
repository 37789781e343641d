//! Per-browser session state.
//!
//! Sessions are keyed by a UUID cookie and live in process memory only,
//! until they sit idle for longer than the store's TTL.

use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::response::Response;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "txt2sql_session";

/// What one browser session remembers between requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    /// Table picked in the sidebar.
    pub selected_table: Option<String>,
    /// Example question waiting to pre-fill the question box.
    pub pending_example: Option<String>,
    /// Show the generated SQL next to explanations.
    pub show_sql: bool,
    /// Show how long a question took.
    pub show_execution_time: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            selected_table: None,
            pending_example: None,
            show_sql: true,
            show_execution_time: true,
        }
    }
}

/// Default idle time after which a session is forgotten.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug)]
struct Entry {
    state: SessionState,
    last_seen: Instant,
}

/// In-memory session map.
///
/// Reads never create entries; only [`SessionStore::update`] does. Entries
/// idle for longer than the TTL are swept on every access. The lock is only
/// held while copying state in or out, never across database or model calls.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns a copy of the session, or the defaults for an unknown id.
    pub async fn get(&self, id: Uuid) -> SessionState {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sweep(&mut sessions, self.ttl, now);
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = now;
                entry.state.clone()
            }
            None => SessionState::default(),
        }
    }

    /// Applies `change` to the session and returns the updated copy.
    pub async fn update<F>(&self, id: Uuid, change: F) -> SessionState
    where
        F: FnOnce(&mut SessionState),
    {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sweep(&mut sessions, self.ttl, now);
        let entry = sessions.entry(id).or_insert_with(|| Entry {
            state: SessionState::default(),
            last_seen: now,
        });
        entry.last_seen = now;
        change(&mut entry.state);
        entry.state.clone()
    }

    /// Returns the session with its pending example removed from the store.
    pub async fn take_pending_example(&self, id: Uuid) -> SessionState {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sweep(&mut sessions, self.ttl, now);
        match sessions.get_mut(&id) {
            Some(entry) => {
                entry.last_seen = now;
                let snapshot = entry.state.clone();
                entry.state.pending_example = None;
                snapshot
            }
            None => SessionState::default(),
        }
    }

    /// Drops sessions idle at `now` and returns how many were removed.
    pub async fn evict_idle(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.lock().await;
        sweep(&mut sessions, self.ttl, now)
    }

    /// Number of known sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn sweep(sessions: &mut HashMap<Uuid, Entry>, ttl: Duration, now: Instant) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= ttl);
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, remaining = sessions.len(), "Evicted idle dashboard sessions");
    }
    evicted
}

/// The session a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: Uuid,
    /// True if the request carried no valid cookie and one must be set.
    pub is_new: bool,
}

impl SessionHandle {
    /// Reads the session cookie, minting a fresh id if it is absent or invalid.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        match session_id(headers) {
            Some(id) => Self { id, is_new: false },
            None => Self {
                id: Uuid::new_v4(),
                is_new: true,
            },
        }
    }

    /// Adds the `Set-Cookie` header to `response` for a new session.
    pub fn attach(&self, mut response: Response) -> Response {
        if self.is_new {
            if let Ok(value) = HeaderValue::from_str(&session_cookie(self.id)) {
                response.headers_mut().append(SET_COOKIE, value);
            }
        }
        response
    }
}

/// Extracts the session id from the `Cookie` headers.
pub fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// `Set-Cookie` value for a session id.
pub fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}
