//! Single-table DML builders.
//!
//! Each builder renders SQL for a [`Dialect`] together with the values to
//! bind, in placeholder order. Identifiers are always quoted.

use sqlmeta_core::{Dialect, Value, quote_ident};

/// Build `"col" = <placeholder>` and advance the placeholder index.
fn assignment(column: &str, dialect: Dialect, next: &mut usize) -> String {
    let clause = format!("{} = {}", quote_ident(column, dialect), dialect.placeholder(*next));
    *next += 1;
    clause
}

/// INSERT of one row.
///
/// # Example
///
/// ```
/// use sqlmeta_core::Dialect;
/// use sqlmeta_query::InsertStatement;
///
/// let (sql, params) = InsertStatement::new("hero")
///     .value("name", "Spider-Man")
///     .value("age", 25)
///     .build(Dialect::Postgres);
/// assert_eq!(sql, r#"INSERT INTO "hero" ("name", "age") VALUES ($1, $2)"#);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct InsertStatement<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    values: Vec<Value>,
    returning: Option<&'a str>,
}

impl<'a> InsertStatement<'a> {
    /// Start an INSERT into `table`.
    pub fn new(table: &'a str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
            returning: None,
        }
    }

    /// Add a column and its value.
    pub fn value(mut self, column: &'a str, value: impl Into<Value>) -> Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    /// Ask the engine to return `column` of the inserted row.
    pub fn returning(mut self, column: &'a str) -> Self {
        self.returning = Some(column);
        self
    }

    /// Render the statement and its parameters.
    pub fn build(self, dialect: Dialect) -> (String, Vec<Value>) {
        let table = quote_ident(self.table, dialect);
        let mut sql = if self.columns.is_empty() {
            match dialect {
                Dialect::MySql => format!("INSERT INTO {table} () VALUES ()"),
                Dialect::Sqlite | Dialect::Postgres => {
                    format!("INSERT INTO {table} DEFAULT VALUES")
                }
            }
        } else {
            let columns: Vec<_> = self
                .columns
                .iter()
                .map(|c| quote_ident(c, dialect))
                .collect();
            let placeholders: Vec<_> = (1..=self.columns.len())
                .map(|i| dialect.placeholder(i))
                .collect();
            format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                columns.join(", "),
                placeholders.join(", ")
            )
        };

        if let Some(column) = self.returning {
            sql.push_str(" RETURNING ");
            sql.push_str(&quote_ident(column, dialect));
        }

        (sql, self.values)
    }
}

/// UPDATE of the row identified by one key column.
#[derive(Debug, Clone)]
pub struct UpdateStatement<'a> {
    table: &'a str,
    sets: Vec<(&'a str, Value)>,
    key: (&'a str, Value),
}

impl<'a> UpdateStatement<'a> {
    /// Start an UPDATE of the row of `table` whose `key_column` is `key`.
    pub fn new(table: &'a str, key_column: &'a str, key: impl Into<Value>) -> Self {
        Self {
            table,
            sets: Vec::new(),
            key: (key_column, key.into()),
        }
    }

    /// Assign `value` to `column`.
    pub fn set(mut self, column: &'a str, value: impl Into<Value>) -> Self {
        self.sets.push((column, value.into()));
        self
    }

    /// True if no column is assigned; such an update has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Render the statement and its parameters. The key value binds last.
    pub fn build(self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut next = 1;
        let sets: Vec<_> = self
            .sets
            .iter()
            .map(|(column, _)| assignment(column, dialect, &mut next))
            .collect();
        let filter = assignment(self.key.0, dialect, &mut next);

        let sql = format!(
            "UPDATE {} SET {} WHERE {filter}",
            quote_ident(self.table, dialect),
            sets.join(", ")
        );
        let mut params: Vec<Value> = self.sets.into_iter().map(|(_, v)| v).collect();
        params.push(self.key.1);
        (sql, params)
    }
}

/// DELETE of the row identified by one key column.
#[derive(Debug, Clone)]
pub struct DeleteStatement<'a> {
    table: &'a str,
    key: (&'a str, Value),
}

impl<'a> DeleteStatement<'a> {
    /// Delete the row of `table` whose `key_column` is `key`.
    pub fn new(table: &'a str, key_column: &'a str, key: impl Into<Value>) -> Self {
        Self {
            table,
            key: (key_column, key.into()),
        }
    }

    /// Render the statement and its parameters.
    pub fn build(self, dialect: Dialect) -> (String, Vec<Value>) {
        let mut next = 1;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_ident(self.table, dialect),
            assignment(self.key.0, dialect, &mut next)
        );
        (sql, vec![self.key.1])
    }
}

/// SELECT from one table, optionally restricted to one key value.
#[derive(Debug, Clone)]
pub struct SelectStatement<'a> {
    table: &'a str,
    columns: Vec<&'a str>,
    key: Option<(&'a str, Value)>,
    probe: bool,
}

impl<'a> SelectStatement<'a> {
    /// Select `columns` of `table`, in order.
    pub fn new(table: &'a str, columns: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            table,
            columns: columns.into_iter().collect(),
            key: None,
            probe: false,
        }
    }

    /// Existence probe: `SELECT 1 AS a FROM table WHERE key = ?`.
    pub fn exists(table: &'a str, key_column: &'a str, key: impl Into<Value>) -> Self {
        Self {
            table,
            columns: Vec::new(),
            key: Some((key_column, key.into())),
            probe: true,
        }
    }

    /// Restrict to the row whose `key_column` is `key`.
    pub fn by_key(mut self, key_column: &'a str, key: impl Into<Value>) -> Self {
        self.key = Some((key_column, key.into()));
        self
    }

    /// Render the statement and its parameters.
    pub fn build(self, dialect: Dialect) -> (String, Vec<Value>) {
        let projection = if self.probe {
            "1 AS a".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_ident(c, dialect))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut sql = format!(
            "SELECT {projection} FROM {}",
            quote_ident(self.table, dialect)
        );

        let mut params = Vec::new();
        if let Some((column, value)) = self.key {
            let mut next = 1;
            sql.push_str(" WHERE ");
            sql.push_str(&assignment(column, dialect, &mut next));
            params.push(value);
        }
        (sql, params)
    }
}
