//! Statement execution with ordered parameter binding.
//!
//! A [`QueryExecutor`] wraps one connection and runs one statement at a time.
//! Values are bound positionally in the order they are added, so the
//! placeholders in the SQL text line up with [`QueryExecutor::add_bind_value`]
//! calls. After a run the executor holds the result and a row cursor.

use sqlmeta_core::{
    Connection, Error, Param, ParamDirection, QueryErrorKind, QueryResult, Result, Row, Value,
};

/// Runs statements against a connection and exposes their results.
pub struct QueryExecutor<'c, C: Connection + ?Sized> {
    conn: &'c C,
    sql: Option<String>,
    params: Vec<Param>,
    result: QueryResult,
    cursor: usize,
    last_error: Option<String>,
}

impl<'c, C: Connection + ?Sized> QueryExecutor<'c, C> {
    /// Create an executor with no statement prepared.
    pub fn new(conn: &'c C) -> Self {
        Self {
            conn,
            sql: None,
            params: Vec::new(),
            result: QueryResult::default(),
            cursor: 0,
            last_error: None,
        }
    }

    /// Set the statement text for the next [`exec`](Self::exec) and clear
    /// any previous bindings and result.
    pub fn prepare(&mut self, sql: impl Into<String>) -> &mut Self {
        self.sql = Some(sql.into());
        self.params.clear();
        self.reset_result();
        self
    }

    /// Append a positional binding.
    pub fn add_bind_value(
        &mut self,
        value: impl Into<Value>,
        direction: ParamDirection,
    ) -> &mut Self {
        self.params.push(Param::new(value.into(), direction));
        self
    }

    /// Append an input binding.
    pub fn bind(&mut self, value: impl Into<Value>) -> &mut Self {
        self.add_bind_value(value, ParamDirection::In)
    }

    /// Append several input bindings, in order.
    pub fn bind_all(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        self.params.extend(values.into_iter().map(Param::input));
        self
    }

    /// Run the prepared statement with the current bindings.
    pub fn exec(&mut self) -> Result<()> {
        let Some(sql) = self.sql.clone() else {
            return Err(Error::query(QueryErrorKind::Syntax, "no statement prepared"));
        };
        self.run(&sql)
    }

    /// Run `sql` directly with the current bindings.
    pub fn exec_sql(&mut self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        self.sql = Some(sql.clone());
        self.run(&sql)
    }

    fn run(&mut self, sql: &str) -> Result<()> {
        self.reset_result();

        tracing::debug!(
            connection = self.conn.name(),
            sql = %sql,
            params = ?self.params.iter().map(|p| &p.value).collect::<Vec<_>>(),
            "executing statement"
        );

        let outcome = if self.params.iter().any(|p| p.direction.is_output())
            && !self.conn.supports_output_params()
        {
            Err(Error::query(
                QueryErrorKind::Unsupported,
                "driver does not support OUT/INOUT parameters",
            ))
        } else {
            self.conn.run(sql, &mut self.params)
        };

        match outcome {
            Ok(result) => {
                self.result = result;
                Ok(())
            }
            Err(err) => {
                let err = err.with_sql(sql);
                let message = err
                    .engine_message()
                    .map_or_else(|| err.to_string(), str::to_string);
                tracing::warn!(
                    connection = self.conn.name(),
                    sql = %sql,
                    error = %message,
                    "statement failed"
                );
                self.last_error = Some(message);
                Err(err)
            }
        }
    }

    fn reset_result(&mut self) {
        self.result = QueryResult::default();
        self.cursor = 0;
        self.last_error = None;
    }

    /// Advance the row cursor.
    pub fn next_row(&mut self) -> Option<&Row> {
        let row = self.result.rows.get(self.cursor)?;
        self.cursor += 1;
        Some(row)
    }

    /// All rows of the last result.
    pub fn rows(&self) -> &[Row] {
        &self.result.rows
    }

    /// Consume the executor, keeping the rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.result.rows
    }

    /// Rows changed by the last statement.
    pub fn rows_affected(&self) -> u64 {
        self.result.rows_affected
    }

    /// Key assigned by the last INSERT, if the engine reported one.
    pub fn last_insert_id(&self) -> Option<i64> {
        self.result.last_insert_id
    }

    /// Engine message of the last failed statement.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Current value of the binding at `idx`; output parameters hold what
    /// the engine wrote back.
    pub fn bound_value(&self, idx: usize) -> Option<&Value> {
        self.params.get(idx).map(|p| &p.value)
    }

    /// Number of bindings.
    pub fn bound_count(&self) -> usize {
        self.params.len()
    }

    /// Statement text of the last prepare or run.
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// The underlying connection.
    pub fn connection(&self) -> &'c C {
        self.conn
    }
}
