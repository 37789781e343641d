//! Reply parsing for model outputs.
//!
//! The tool loop treats a fenced SQL block in a reply as a statement to run;
//! a reply without one is the final answer.

/// A model reply split into prose and an optional SQL statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    /// Text outside the chosen code block, trimmed.
    pub text: String,
    /// Contents of the chosen code block, trimmed.
    pub sql: Option<String>,
}

impl ParsedResponse {
    /// A reply with no SQL.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: None,
        }
    }

    /// A reply carrying SQL.
    pub fn with_sql(text: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sql: Some(sql.into()),
        }
    }
}

/// A fenced block located in a reply, by line range.
#[derive(Debug)]
struct Fence<'a> {
    lang: &'a str,
    open_line: usize,
    close_line: usize,
}

/// Splits a reply into prose and SQL.
///
/// A block tagged `sql` or `postgresql` wins over an untagged block; among
/// candidates of the same kind the first one is used. Blocks tagged with any
/// other language are ignored. Unterminated blocks are not treated as SQL.
pub fn parse_llm_response(response: &str) -> ParsedResponse {
    let lines: Vec<&str> = response.lines().collect();
    let fences = find_fences(&lines);

    let chosen = fences
        .iter()
        .find(|f| is_sql_tag(f.lang))
        .or_else(|| fences.iter().find(|f| f.lang.is_empty()));

    let Some(fence) = chosen else {
        return ParsedResponse::text_only(response.trim());
    };

    let sql = lines[fence.open_line + 1..fence.close_line].join("\n");
    let before = lines[..fence.open_line].join("\n");
    let after = lines[fence.close_line + 1..].join("\n");
    let text = [before.trim(), after.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    ParsedResponse::with_sql(text, sql.trim())
}

fn is_sql_tag(lang: &str) -> bool {
    lang.eq_ignore_ascii_case("sql") || lang.eq_ignore_ascii_case("postgresql")
}

fn find_fences<'a>(lines: &[&'a str]) -> Vec<Fence<'a>> {
    let mut fences = Vec::new();
    let mut open: Option<(usize, &'a str)> = None;

    for (index, line) in lines.iter().enumerate() {
        let Some(rest) = line.trim().strip_prefix("```") else {
            continue;
        };
        match open.take() {
            None => open = Some((index, rest.trim())),
            Some((open_line, lang)) => fences.push(Fence {
                lang,
                open_line,
                close_line: index,
            }),
        }
    }

    fences
}
