//! Read-only guard for SQL proposed by the model.
//!
//! Statements are parsed with the PostgreSQL dialect; only plain reads are
//! allowed to reach the database.

mod parser;

pub use parser::{classify_sql, SqlClassifier};

use crate::error::{Result, Txt2SqlError};
use std::fmt;

/// The kind of statement detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    With,
    Values,
    Explain,
    Show,
    Insert,
    Update,
    Delete,
    Drop,
    Truncate,
    Alter,
    Create,
    Grant,
    Revoke,
    /// A call to a function that changes state.
    Function(String),
    /// More than one statement; holds the first offending (or first) kind.
    Multiple(Box<StatementKind>),
    /// Empty input, unparsable text, or a statement not listed above.
    Unknown,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Select => write!(f, "SELECT"),
            Self::With => write!(f, "WITH (CTE)"),
            Self::Values => write!(f, "VALUES"),
            Self::Explain => write!(f, "EXPLAIN"),
            Self::Show => write!(f, "SHOW"),
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Drop => write!(f, "DROP"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Alter => write!(f, "ALTER"),
            Self::Create => write!(f, "CREATE"),
            Self::Grant => write!(f, "GRANT"),
            Self::Revoke => write!(f, "REVOKE"),
            Self::Function(name) => write!(f, "function {name}()"),
            Self::Multiple(inner) => write!(f, "Multiple ({inner})"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Outcome of classifying a SQL string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// True only if every statement is a plain read.
    pub read_only: bool,
    /// The statement kind detected.
    pub statement: StatementKind,
}

impl Classification {
    /// A read-only classification.
    pub fn read_only(statement: StatementKind) -> Self {
        Self {
            read_only: true,
            statement,
        }
    }

    /// A classification that must not be executed.
    pub fn writes(statement: StatementKind) -> Self {
        Self {
            read_only: false,
            statement,
        }
    }
}

/// Fails with a query error unless `sql` is read-only.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let classification = classify_sql(sql);
    if classification.read_only {
        Ok(())
    } else {
        Err(Txt2SqlError::query(format!(
            "Refusing to run non-read-only statement ({})",
            classification.statement
        )))
    }
}
