//! Dashboard handlers over a started application.

use axum::body::to_bytes;
use axum::extract::State;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;
use axum::Form;
use txt2sql::dashboard::handlers::{self, QueryForm, TableForm};

use super::start_app;

async fn body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn session_headers(response: &Response) -> HeaderMap {
    let cookie = response
        .headers()
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("new sessions get a cookie")
        .to_string();
    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&cookie).unwrap());
    headers
}

#[tokio::test]
async fn test_dashboard_flow() {
    let app = start_app(false).await;
    let state = app.dashboard_state();

    let first = handlers::index(State(state.clone()), HeaderMap::new()).await;
    assert_eq!(first.status(), StatusCode::OK);
    let headers = session_headers(&first);
    let html = body(first).await;
    assert!(html.contains("Text-to-SQL Agent"));
    assert!(html.contains("value=\"orders\""));

    handlers::select_table(
        State(state.clone()),
        headers.clone(),
        Form(TableForm {
            table: "users".to_string(),
        }),
    )
    .await;
    let html = body(handlers::show_sample(State(state.clone()), headers.clone()).await).await;
    assert!(html.contains("Selected: users"));
    assert!(html.contains("<th>id</th>"));

    let form = QueryForm {
        question: "show me the orders".to_string(),
        action: "execute".to_string(),
        show_sql: Some("on".to_string()),
        show_execution_time: None,
    };
    let html = body(handlers::run_query(State(state.clone()), headers.clone(), Form(form)).await).await;
    assert!(html.contains("Query executed successfully!"));
    assert!(!html.contains("Execution Time"));
}

#[tokio::test]
async fn test_sessions_do_not_share_selection() {
    let app = start_app(false).await;
    let state = app.dashboard_state();

    let a = session_headers(&handlers::index(State(state.clone()), HeaderMap::new()).await);
    let b = session_headers(&handlers::index(State(state.clone()), HeaderMap::new()).await);

    handlers::select_table(
        State(state.clone()),
        a.clone(),
        Form(TableForm {
            table: "orders".to_string(),
        }),
    )
    .await;

    let html_a = body(handlers::index(State(state.clone()), a).await).await;
    let html_b = body(handlers::index(State(state.clone()), b).await).await;
    assert!(html_a.contains("Selected: orders"));
    assert!(!html_b.contains("Selected: orders"));
    assert_eq!(state.sessions.len().await, 1);
}
