//! Database connection contracts.
//!
//! Drivers implement [`Connector`] (open a connection from a configuration)
//! and [`Connection`] (run one statement). Everything above the driver only
//! ever sees these traits, so the mapping engine can be exercised against a
//! stub connection.

use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::error::{Error, QueryErrorKind, Result};
use crate::row::Row;
use crate::value::Value;

/// SQL dialect spoken by a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Positional placeholder for the 1-based parameter `idx`.
    pub fn placeholder(self, idx: usize) -> String {
        match self {
            Dialect::Postgres => format!("${idx}"),
            Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    /// Identifier quote character.
    pub const fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }
}

/// Direction of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    InOut,
}

impl ParamDirection {
    /// True if the engine writes a value back into this parameter.
    pub const fn is_output(self) -> bool {
        matches!(self, ParamDirection::Out | ParamDirection::InOut)
    }
}

/// One positional parameter binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Value,
    pub direction: ParamDirection,
}

impl Param {
    /// An input parameter.
    pub fn input(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            direction: ParamDirection::In,
        }
    }

    /// A parameter with an explicit direction.
    pub fn new(value: Value, direction: ParamDirection) -> Self {
        Self { value, direction }
    }
}

/// Everything one statement produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Rows returned, empty for statements without a result set.
    pub rows: Vec<Row>,
    /// Rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Key assigned by the last INSERT, when the engine reports one.
    pub last_insert_id: Option<i64>,
}

/// A database connection.
///
/// Implementations must be safe to share, but the registry hands every
/// worker thread its own connection, so contention is not expected.
pub trait Connection: Send + Sync {
    /// Registry-scoped connection name.
    fn name(&self) -> &str;

    /// SQL dialect of the engine behind this connection.
    fn dialect(&self) -> Dialect;

    /// Run one statement with positional parameters.
    ///
    /// Output parameters, when supported, are written back into `params`.
    fn run(&self, sql: &str, params: &mut [Param]) -> Result<QueryResult>;

    /// Close the connection. Later calls fail with a disconnected error.
    fn close(&self) -> Result<()>;

    /// Whether the driver supports OUT / INOUT parameters.
    fn supports_output_params(&self) -> bool {
        false
    }

    /// Run a statement with input parameters, returning rows affected.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut bound: Vec<Param> = params.iter().cloned().map(Param::input).collect();
        self.run(sql, &mut bound).map(|r| r.rows_affected)
    }

    /// Run a query with input parameters, returning its rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let mut bound: Vec<Param> = params.iter().cloned().map(Param::input).collect();
        self.run(sql, &mut bound).map(|r| r.rows)
    }
}

/// Opens connections from a reference configuration.
pub trait Connector: Send + Sync + 'static {
    /// Connection type produced.
    type Conn: Connection + 'static;

    /// Driver identifier this connector accepts in `ConnectionConfig::driver`.
    fn driver(&self) -> &'static str;

    /// Open a new connection named `name` using `config`.
    fn open(&self, config: &ConnectionConfig, name: &str) -> Result<Self::Conn>;
}

/// Anything that can hand the calling thread a connection.
///
/// The connection registry is the production implementation; an
/// `Arc<C>` serves a single fixed connection, which is what tests use.
pub trait ConnectionSource {
    /// Connection type handed out.
    type Conn: Connection + ?Sized;

    /// The calling thread's connection.
    fn connection(&self) -> Result<Arc<Self::Conn>>;
}

impl<C: Connection + ?Sized> ConnectionSource for Arc<C> {
    type Conn = C;

    fn connection(&self) -> Result<Arc<C>> {
        Ok(Arc::clone(self))
    }
}

/// Reject output parameters on drivers that cannot return them.
pub fn ensure_input_only(params: &[Param]) -> Result<()> {
    if params.iter().any(|p| p.direction.is_output()) {
        return Err(Error::query(
            QueryErrorKind::Unsupported,
            "driver does not support OUT/INOUT parameters",
        ));
    }
    Ok(())
}
