//! Schema snapshot types.
//!
//! A [`Schema`] is rebuilt from the catalog on every request; nothing here is
//! cached between calls.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Snapshot of the `public` schema: tables in name order plus all foreign keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Base tables, ordered by name.
    pub tables: Vec<Table>,

    /// Foreign-key constraints across all tables.
    pub foreign_keys: Vec<ForeignKey>,
}

impl Schema {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table names in snapshot order.
    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    /// Looks up a table by exact name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Returns true if a table with exactly this name exists.
    pub fn contains_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Foreign keys whose source is the given table.
    pub fn foreign_keys_from<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a ForeignKey> {
        self.foreign_keys.iter().filter(move |fk| fk.from_table == table)
    }

    /// Renders the snapshot as plain text for a model prompt.
    ///
    /// ```text
    /// Table: orders
    ///   - id: integer (PK, NOT NULL)
    ///   - user_id: integer (NOT NULL, FK -> users.id)
    ///   Indexes: idx_orders_user (user_id)
    /// ```
    pub fn format_for_llm(&self) -> String {
        let mut out = String::from("Database Schema:\n\n");

        for table in &self.tables {
            let _ = writeln!(out, "Table: {}", table.name);
            for column in &table.columns {
                out.push_str(&self.column_line(table, column));
            }
            if !table.indexes.is_empty() {
                let indexes = table
                    .indexes
                    .iter()
                    .map(|idx| {
                        let unique = if idx.is_unique { "UNIQUE " } else { "" };
                        format!("{unique}{} ({})", idx.name, idx.columns.join(", "))
                    })
                    .collect::<Vec<_>>()
                    .join("; ");
                let _ = writeln!(out, "  Indexes: {indexes}");
            }
            out.push('\n');
        }

        if !self.foreign_keys.is_empty() {
            out.push_str("Foreign Keys:\n");
            for fk in &self.foreign_keys {
                let _ = writeln!(out, "  - {fk}");
            }
        }

        out
    }

    fn column_line(&self, table: &Table, column: &Column) -> String {
        let mut notes: Vec<String> = Vec::new();
        if table.primary_key.contains(&column.name) {
            notes.push("PK".to_string());
        }
        if !column.is_nullable {
            notes.push("NOT NULL".to_string());
        }
        if let Some(default) = &column.default {
            notes.push(format!("DEFAULT {default}"));
        }
        for fk in self.foreign_keys_from(&table.name) {
            if let Some(pos) = fk.from_columns.iter().position(|c| c == &column.name) {
                let target = fk.to_columns.get(pos).map(String::as_str).unwrap_or("?");
                notes.push(format!("FK -> {}.{}", fk.to_table, target));
            }
        }

        if notes.is_empty() {
            format!("  - {}: {}\n", column.name, column.data_type)
        } else {
            format!(
                "  - {}: {} ({})\n",
                column.name,
                column.data_type,
                notes.join(", ")
            )
        }
    }
}

/// A base table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in ordinal order.
    pub columns: Vec<Column>,

    /// Primary-key column names in key order.
    pub primary_key: Vec<String>,

    /// Non-primary indexes.
    pub indexes: Vec<Index>,
}

impl Table {
    /// Creates a table with no columns.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a column.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Sets the primary-key columns.
    pub fn with_primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Appends an index.
    pub fn with_index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Column names in ordinal order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A table column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared type (e.g. "integer", "character varying(255)").
    pub data_type: String,

    /// Whether NULL is allowed.
    pub is_nullable: bool,

    /// Default expression, if any.
    pub default: Option<String>,
}

impl Column {
    /// Creates a nullable column without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_nullable: true,
            default: None,
        }
    }

    /// Sets nullability.
    pub fn nullable(self, nullable: bool) -> Self {
        Self {
            is_nullable: nullable,
            ..self
        }
    }

    /// Sets the default expression.
    pub fn with_default(self, default: impl Into<String>) -> Self {
        Self {
            default: Some(default.into()),
            ..self
        }
    }
}

/// A foreign-key constraint. Column lists are positionally paired.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,

    /// Referencing table.
    pub from_table: String,

    /// Referencing columns, in constraint order.
    pub from_columns: Vec<String>,

    /// Referenced table.
    pub to_table: String,

    /// Referenced columns, in constraint order.
    pub to_columns: Vec<String>,
}

impl ForeignKey {
    /// Creates a foreign key.
    pub fn new(
        name: impl Into<String>,
        from_table: impl Into<String>,
        from_columns: Vec<String>,
        to_table: impl Into<String>,
        to_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_table: from_table.into(),
            from_columns,
            to_table: to_table.into(),
            to_columns,
        }
    }
}

impl std::fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}({}) -> {}({})",
            self.from_table,
            self.from_columns.join(", "),
            self.to_table,
            self.to_columns.join(", ")
        )
    }
}

/// A non-primary index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,

    /// Indexed columns in index order.
    pub columns: Vec<String>,

    /// Whether the index enforces uniqueness.
    pub is_unique: bool,
}

impl Index {
    /// Creates a non-unique index.
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            is_unique: false,
        }
    }

    /// Sets uniqueness.
    pub fn unique(self, unique: bool) -> Self {
        Self {
            is_unique: unique,
            ..self
        }
    }
}
