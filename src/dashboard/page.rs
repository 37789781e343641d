//! Server-rendered dashboard page.
//!
//! Everything that came from a user, the model, or the database goes through
//! [`escape_html`] before it is written into the page.

use std::fmt::Write as _;

use super::session::SessionState;
use crate::agent::QueryResult;

/// Questions offered as one-click examples.
pub const EXAMPLE_QUESTIONS: [&str; 4] = [
    "Show me the top 10 customers by order value",
    "Find all products with low stock (less than 10 units)",
    "Calculate total sales by month for this year",
    "List employees who joined in the last 6 months",
];

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; display: flex; }
aside { width: 18rem; background: #f0f2f6; padding: 1rem; min-height: 100vh; }
main { flex: 1; padding: 1rem 2rem; }
.main-header { font-size: 2.5rem; font-weight: bold; color: #1f77b4; text-align: center; }
.sub-header { font-size: 1.2rem; color: #666; text-align: center; margin-bottom: 2rem; }
.metric { font-size: 2rem; font-weight: bold; }
.success-message { background: #d4edda; color: #155724; padding: 1rem; border-radius: .5rem; }
.error-message { background: #f8d7da; color: #721c24; padding: 1rem; border-radius: .5rem; }
.info-message { background: #d1ecf1; color: #0c5460; padding: 1rem; border-radius: .5rem; }
table { border-collapse: collapse; }
th, td { border: 1px solid #ccc; padding: .25rem .5rem; text-align: left; }
textarea { width: 100%; }
pre { background: #f6f8fa; padding: 1rem; }
"#;

/// Sidebar table list, or the error that prevented loading it.
#[derive(Debug, Clone, PartialEq)]
pub enum TablesView {
    Loaded(Vec<String>),
    Failed(String),
}

/// Sample rows for the selected table.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleView {
    Rows {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Failed(String),
}

/// What a question action produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    /// `execute`: the agent's answer.
    Answer(QueryResult),
    /// `generate`: SQL only.
    Generated(String),
    /// `explain`: SQL plus its explanation.
    Explained { sql: String, explanation: String },
    /// Any action that failed before producing a result.
    Failed(String),
}

/// Everything needed to render one page.
#[derive(Debug, Clone)]
pub struct PageView<'a> {
    pub session: &'a SessionState,
    pub tables: TablesView,
    pub question: String,
    pub sample: Option<SampleView>,
    pub result: Option<ResultView>,
}

/// Escapes text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders the full page.
pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Text-to-SQL Agent</title>\n<style>{STYLE}</style>\n</head>\n<body>\n"
    );
    render_sidebar(&mut html, view);

    html.push_str("<main>\n");
    html.push_str("<h1 class=\"main-header\">Text-to-SQL Agent</h1>\n");
    html.push_str(
        "<p class=\"sub-header\">Convert natural language to SQL queries and explore your database</p>\n",
    );
    render_query_form(&mut html, view);
    if let Some(result) = &view.result {
        render_result(&mut html, result, view.session);
    }
    html.push_str("</main>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, view: &PageView<'_>) {
    html.push_str("<aside>\n<h2>Database Info</h2>\n");

    match &view.tables {
        TablesView::Failed(error) => {
            let _ = writeln!(
                html,
                "<div class=\"error-message\">Error getting database info: {}</div>",
                escape_html(error)
            );
        }
        TablesView::Loaded(tables) => {
            let _ = writeln!(
                html,
                "<div>Tables</div>\n<div class=\"metric\">{}</div>\n<h3>Available Tables</h3>",
                tables.len()
            );
            for table in tables {
                let table = escape_html(table);
                let _ = writeln!(
                    html,
                    "<form method=\"post\" action=\"/tables/select\">\
                     <input type=\"hidden\" name=\"table\" value=\"{table}\">\
                     <button type=\"submit\">{table}</button></form>"
                );
            }
        }
    }

    if let Some(selected) = &view.session.selected_table {
        let _ = writeln!(
            html,
            "<div class=\"info-message\">Selected: {}</div>\n\
             <form method=\"post\" action=\"/tables/sample\">\
             <button type=\"submit\">Show Sample Data</button></form>",
            escape_html(selected)
        );
    }

    match &view.sample {
        Some(SampleView::Rows { headers, rows }) => render_table(html, headers, rows),
        Some(SampleView::Failed(error)) => {
            let _ = writeln!(
                html,
                "<div class=\"error-message\">Error retrieving sample data: {}</div>",
                escape_html(error)
            );
        }
        None => {}
    }

    html.push_str("</aside>\n");
}

fn render_query_form(html: &mut String, view: &PageView<'_>) {
    let checked = |on: bool| if on { " checked" } else { "" };
    let _ = writeln!(
        html,
        "<h2>Natural Language Query</h2>\n\
         <form method=\"post\" action=\"/query\">\n\
         <label for=\"question\">Enter your question in natural language:</label>\n\
         <textarea id=\"question\" name=\"question\" rows=\"4\" \
         placeholder=\"e.g., Show me all users who signed up in the last month\">{}</textarea>\n\
         <div>\n\
         <button type=\"submit\" name=\"action\" value=\"execute\">Execute Query</button>\n\
         <button type=\"submit\" name=\"action\" value=\"generate\">Generate SQL Only</button>\n\
         <button type=\"submit\" name=\"action\" value=\"explain\">Explain Query</button>\n\
         </div>\n\
         <h3>Query Settings</h3>\n\
         <label><input type=\"checkbox\" name=\"show_sql\" value=\"on\"{}> Show generated SQL</label>\n\
         <label><input type=\"checkbox\" name=\"show_execution_time\" value=\"on\"{}> Show execution time</label>\n\
         </form>",
        escape_html(&view.question),
        checked(view.session.show_sql),
        checked(view.session.show_execution_time),
    );

    html.push_str("<h3>Quick Examples</h3>\n");
    for (index, example) in EXAMPLE_QUESTIONS.iter().enumerate() {
        let _ = writeln!(
            html,
            "<form method=\"post\" action=\"/examples/{index}\">\
             <button type=\"submit\">{}</button></form>",
            escape_html(example)
        );
    }
}

fn render_result(html: &mut String, result: &ResultView, session: &SessionState) {
    match result {
        ResultView::Answer(answer) if answer.success => {
            html.push_str("<div class=\"success-message\">Query executed successfully!</div>\n");
            let _ = writeln!(
                html,
                "<h3>Results</h3>\n<div class=\"output\">{}</div>",
                escape_html(answer.output.as_deref().unwrap_or_default())
            );
            if session.show_execution_time {
                let _ = writeln!(
                    html,
                    "<div>Execution Time</div>\n<div class=\"metric\">{}s</div>",
                    answer.seconds_display()
                );
            }
        }
        ResultView::Answer(answer) => {
            let _ = writeln!(
                html,
                "<div class=\"error-message\">Query failed</div>\n\
                 <div class=\"error-message\">Error: {}</div>",
                escape_html(answer.error.as_deref().unwrap_or_default())
            );
        }
        ResultView::Generated(sql) => {
            html.push_str("<div class=\"info-message\">SQL Generated Successfully</div>\n");
            render_sql(html, sql);
        }
        ResultView::Explained { sql, explanation } => {
            if session.show_sql {
                render_sql(html, sql);
            }
            let _ = writeln!(
                html,
                "<h3>Explanation</h3>\n<div class=\"output\">{}</div>",
                escape_html(explanation)
            );
        }
        ResultView::Failed(error) => {
            let _ = writeln!(
                html,
                "<div class=\"error-message\">{}</div>",
                escape_html(error)
            );
        }
    }
}

fn render_sql(html: &mut String, sql: &str) {
    let _ = writeln!(
        html,
        "<h3>Generated SQL</h3>\n<pre><code class=\"language-sql\">{}</code></pre>",
        escape_html(sql)
    );
}

fn render_table(html: &mut String, headers: &[String], rows: &[Vec<String>]) {
    html.push_str("<table>\n<tr>");
    for header in headers {
        let _ = write!(html, "<th>{}</th>", escape_html(header));
    }
    html.push_str("</tr>\n");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape_html(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</table>\n");
}
