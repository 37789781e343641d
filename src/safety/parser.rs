//! SQL parsing and read-only classification.

use sqlparser::ast::{
    visit_expressions, Expr, Query, Select, SetExpr, Statement, TableFactor, TableWithJoins,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use std::ops::ControlFlow;
use tracing::debug;

use super::{Classification, StatementKind};

/// Functions that change state even when called from a SELECT.
const SIDE_EFFECTING_FUNCTIONS: &[&str] = &[
    "nextval",
    "setval",
    "set_config",
    "pg_notify",
    "pg_terminate_backend",
    "pg_cancel_backend",
    "pg_reload_conf",
    "pg_rotate_logfile",
    "lo_create",
    "lo_import",
    "lo_export",
    "lo_unlink",
    "lo_put",
    "lo_from_bytea",
    "dblink_exec",
];

/// Parses SQL and decides whether it only reads data.
#[derive(Debug)]
pub struct SqlClassifier {
    dialect: PostgreSqlDialect,
}

impl Default for SqlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlClassifier {
    /// Creates a classifier using the PostgreSQL dialect.
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Classifies `sql`. Unparsable or empty input is never read-only.
    pub fn classify(&self, sql: &str) -> Classification {
        let statements = match Parser::parse_sql(&self.dialect, sql) {
            Ok(statements) => statements,
            Err(e) => {
                debug!(error = %e, "SQL did not parse");
                return Classification::writes(StatementKind::Unknown);
            }
        };

        if let Some(name) = statements.iter().find_map(side_effecting_call) {
            debug!(function = %name, "SQL calls a side-effecting function");
            return Classification::writes(StatementKind::Function(name));
        }

        match statements.as_slice() {
            [] => Classification::writes(StatementKind::Unknown),
            [single] => classify_statement(single),
            many => {
                let classified: Vec<Classification> =
                    many.iter().map(classify_statement).collect();
                let worst = classified
                    .iter()
                    .find(|c| !c.read_only)
                    .unwrap_or(&classified[0]);
                Classification {
                    read_only: worst.read_only,
                    statement: StatementKind::Multiple(Box::new(worst.statement.clone())),
                }
            }
        }
    }
}

/// Classifies SQL with a fresh classifier.
pub fn classify_sql(sql: &str) -> Classification {
    SqlClassifier::new().classify(sql)
}

fn classify_statement(statement: &Statement) -> Classification {
    match statement {
        Statement::Query(query) => classify_query(query),
        Statement::Explain {
            analyze, statement, ..
        } => {
            // EXPLAIN ANALYZE runs the inner statement.
            let read_only = !*analyze || classify_statement(statement).read_only;
            Classification {
                read_only,
                statement: StatementKind::Explain,
            }
        }
        Statement::ShowVariable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. }
        | Statement::ShowCreate { .. }
        | Statement::ShowFunctions { .. }
        | Statement::ShowStatus { .. }
        | Statement::ShowCollation { .. } => Classification::read_only(StatementKind::Show),

        Statement::Insert(_) => Classification::writes(StatementKind::Insert),
        Statement::Update { .. } => Classification::writes(StatementKind::Update),
        Statement::Delete(_) => Classification::writes(StatementKind::Delete),
        Statement::Drop { .. } => Classification::writes(StatementKind::Drop),
        Statement::Truncate { .. } => Classification::writes(StatementKind::Truncate),
        Statement::AlterTable { .. }
        | Statement::AlterIndex { .. }
        | Statement::AlterView { .. }
        | Statement::AlterRole { .. } => Classification::writes(StatementKind::Alter),
        Statement::CreateTable { .. }
        | Statement::CreateIndex { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::CreateFunction { .. }
        | Statement::CreateRole { .. }
        | Statement::CreateSequence { .. } => Classification::writes(StatementKind::Create),
        Statement::Grant { .. } => Classification::writes(StatementKind::Grant),
        Statement::Revoke { .. } => Classification::writes(StatementKind::Revoke),

        _ => Classification::writes(StatementKind::Unknown),
    }
}

fn classify_query(query: &Query) -> Classification {
    let kind = if query.with.is_some() {
        StatementKind::With
    } else {
        match query.body.as_ref() {
            SetExpr::Values(_) => StatementKind::Values,
            _ => StatementKind::Select,
        }
    };

    // Row locks (FOR UPDATE / FOR SHARE) are not plain reads.
    if !query.locks.is_empty() {
        return Classification::writes(kind);
    }

    if let Some(with) = &query.with {
        if let Some(bad) = with
            .cte_tables
            .iter()
            .map(|cte| classify_query(&cte.query))
            .find(|c| !c.read_only)
        {
            return Classification::writes(bad.statement);
        }
    }

    match classify_set_expr(&query.body) {
        Some(bad) => Classification::writes(bad),
        None => Classification::read_only(kind),
    }
}

/// Returns the offending statement kind if the expression writes.
fn classify_set_expr(set_expr: &SetExpr) -> Option<StatementKind> {
    match set_expr {
        SetExpr::Select(select) => classify_select(select),
        SetExpr::Query(query) => non_read_only(classify_query(query)),
        SetExpr::SetOperation { left, right, .. } => {
            classify_set_expr(left).or_else(|| classify_set_expr(right))
        }
        SetExpr::Values(_) | SetExpr::Table(_) => None,
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => non_read_only(classify_statement(stmt)),
        #[allow(unreachable_patterns)]
        _ => Some(StatementKind::Unknown),
    }
}

fn classify_select(select: &Select) -> Option<StatementKind> {
    if select.into.is_some() {
        return Some(StatementKind::Create);
    }
    select.from.iter().find_map(classify_table_with_joins)
}

fn classify_table_with_joins(twj: &TableWithJoins) -> Option<StatementKind> {
    classify_table_factor(&twj.relation).or_else(|| {
        twj.joins
            .iter()
            .find_map(|join| classify_table_factor(&join.relation))
    })
}

fn classify_table_factor(factor: &TableFactor) -> Option<StatementKind> {
    match factor {
        TableFactor::Derived { subquery, .. } => non_read_only(classify_query(subquery)),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => None,
    }
}

/// First call to a function from [`SIDE_EFFECTING_FUNCTIONS`], at any depth.
fn side_effecting_call(statement: &Statement) -> Option<String> {
    let found = visit_expressions(statement, |expr| {
        if let Expr::Function(function) = expr {
            if let Some(ident) = function.name.0.last() {
                let name = ident.value.to_lowercase();
                if SIDE_EFFECTING_FUNCTIONS.contains(&name.as_str()) {
                    return ControlFlow::Break(name);
                }
            }
        }
        ControlFlow::Continue(())
    });

    match found {
        ControlFlow::Break(name) => Some(name),
        ControlFlow::Continue(()) => None,
    }
}

fn non_read_only(classification: Classification) -> Option<StatementKind> {
    (!classification.read_only).then_some(classification.statement)
}
