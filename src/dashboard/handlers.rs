//! HTTP handlers for the dashboard.
//!
//! Agent and database failures are rendered into the page; no handler turns
//! them into a 5xx response.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::page::{render_page, PageView, ResultView, SampleView, TablesView, EXAMPLE_QUESTIONS};
use super::session::{SessionHandle, SessionState};
use super::SharedState;

/// Form posted by a sidebar table button.
#[derive(Debug, Deserialize)]
pub struct TableForm {
    pub table: String,
}

/// Form posted by the question box.
#[derive(Debug, Default, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub action: String,
    pub show_sql: Option<String>,
    pub show_execution_time: Option<String>,
}

/// `GET /`
pub async fn index(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionHandle::from_headers(&headers);
    let snapshot = state.sessions.take_pending_example(session.id).await;
    let question = snapshot.pending_example.clone().unwrap_or_default();

    let page = render(&state, &snapshot, question, None, None).await;
    session.attach(page)
}

/// `POST /tables/select`
pub async fn select_table(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<TableForm>,
) -> Response {
    let session = SessionHandle::from_headers(&headers);
    debug!(table = %form.table, "Table selected");
    state
        .sessions
        .update(session.id, |s| s.selected_table = Some(form.table))
        .await;

    session.attach(Redirect::to("/").into_response())
}

/// `POST /tables/sample`
pub async fn show_sample(State(state): State<SharedState>, headers: HeaderMap) -> Response {
    let session = SessionHandle::from_headers(&headers);
    let snapshot = state.sessions.get(session.id).await;

    let sample = match &snapshot.selected_table {
        None => None,
        Some(table) => {
            let result = state
                .agent
                .inspector()
                .sample_rows(table, state.sample_limit)
                .await;
            Some(match result {
                Ok(rows) => SampleView::Rows {
                    headers: rows.column_names(),
                    rows: rows.display_rows(None),
                },
                Err(e) => {
                    warn!(table = %table, error = %e, "Sampling table failed");
                    SampleView::Failed(e.to_string())
                }
            })
        }
    };

    let page = render(&state, &snapshot, String::new(), sample, None).await;
    session.attach(page)
}

/// `POST /examples/{index}`
pub async fn choose_example(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    let Some(example) = EXAMPLE_QUESTIONS.get(index) else {
        return (StatusCode::NOT_FOUND, "Unknown example").into_response();
    };

    let session = SessionHandle::from_headers(&headers);
    state
        .sessions
        .update(session.id, |s| s.pending_example = Some(example.to_string()))
        .await;

    session.attach(Redirect::to("/").into_response())
}

/// `POST /query`
pub async fn run_query(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Form(form): Form<QueryForm>,
) -> Response {
    let session = SessionHandle::from_headers(&headers);
    let show_sql = form.show_sql.is_some();
    let show_execution_time = form.show_execution_time.is_some();
    let snapshot = state
        .sessions
        .update(session.id, |s| {
            s.show_sql = show_sql;
            s.show_execution_time = show_execution_time;
        })
        .await;

    let question = form.question.trim().to_string();
    let result = if question.is_empty() {
        None
    } else {
        info!(action = %form.action, question_len = question.len(), "Dashboard query");
        Some(run_action(&state, &form.action, &question).await)
    };

    let page = render(&state, &snapshot, question, None, result).await;
    session.attach(page)
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

async fn run_action(state: &SharedState, action: &str, question: &str) -> ResultView {
    let agent = &state.agent;
    match action {
        "generate" => match agent.generate_sql(question).await {
            Ok(sql) => ResultView::Generated(sql),
            Err(e) => ResultView::Failed(format!("Error generating SQL: {e}")),
        },
        "explain" => {
            let sql = match agent.generate_sql(question).await {
                Ok(sql) => sql,
                Err(e) => return ResultView::Failed(format!("Error explaining query: {e}")),
            };
            match agent.explain(&sql).await {
                Ok(explanation) => ResultView::Explained { sql, explanation },
                Err(e) => ResultView::Failed(format!("Error explaining query: {e}")),
            }
        }
        _ => ResultView::Answer(agent.answer(question).await),
    }
}

async fn render(
    state: &SharedState,
    session: &SessionState,
    question: String,
    sample: Option<SampleView>,
    result: Option<ResultView>,
) -> Response {
    let tables = match state.agent.inspector().table_names().await {
        Ok(tables) => TablesView::Loaded(tables),
        Err(e) => {
            warn!(error = %e, "Loading tables for sidebar failed");
            TablesView::Failed(e.to_string())
        }
    };

    let view = PageView {
        session,
        tables,
        question,
        sample,
        result,
    };
    Html(render_page(&view)).into_response()
}
