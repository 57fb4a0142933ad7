//! Error types shared by every sqlmeta crate.
//!
//! Every public operation returns [`Result`]; nothing panics across a crate
//! boundary. The variants follow the failure taxonomy of the mapping layer:
//! connections that cannot be opened, statements the engine rejected,
//! malformed schema metadata, and row/value contract violations.

use std::fmt;

use crate::types::SqlType;

/// Boxed source error carried by driver failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout sqlmeta.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The top-level error type.
#[derive(Debug)]
pub enum Error {
    /// A reference or cloned connection could not be opened or was lost.
    Connection(ConnectionError),
    /// The engine rejected or failed a statement.
    Query(QueryError),
    /// Model metadata is malformed; the model type cannot be used.
    Schema(SchemaError),
    /// A row did not have the shape the table expects.
    Mapping(String),
    /// A value could not be converted to the requested Rust type.
    Type(TypeError),
}

/// What went wrong while obtaining a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Opening the connection failed.
    Connect,
    /// The reference configuration is unusable.
    Config,
    /// The connection was closed or lost.
    Disconnected,
}

/// Connection failure details.
#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<BoxError>,
}

/// Classification of statement failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// The statement could not be parsed or prepared.
    Syntax,
    /// A NOT NULL, UNIQUE, FOREIGN KEY or CHECK constraint failed.
    Constraint,
    /// Any other engine-side failure.
    Database,
    /// The driver does not support what the statement asked for.
    Unsupported,
}

/// Statement failure details, carrying the engine's own message.
#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<BoxError>,
}

/// Malformed or duplicate model metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub table: String,
    pub message: String,
}

/// A value could not be converted.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeError {
    /// The kind the caller asked for.
    pub expected: SqlType,
    /// A short description of what was found instead.
    pub actual: String,
    /// The field being converted, when known.
    pub field: Option<String>,
}

impl Error {
    /// Build a connection error without a source.
    pub fn connection(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Error::Connection(ConnectionError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Build a query error without a source.
    pub fn query(kind: QueryErrorKind, message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            kind,
            sql: None,
            message: message.into(),
            source: None,
        })
    }

    /// Build a schema error for `table`.
    pub fn schema(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Schema(SchemaError {
            table: table.into(),
            message: message.into(),
        })
    }

    /// A model was asked about a field it does not declare.
    pub fn unknown_field(table: &str, field: &str) -> Self {
        Error::Mapping(format!("model `{table}` has no field `{field}`"))
    }

    /// Attach the statement text to a query error. Other variants pass through.
    #[must_use]
    pub fn with_sql(self, sql: &str) -> Self {
        match self {
            Error::Query(mut err) => {
                if err.sql.is_none() {
                    err.sql = Some(sql.to_string());
                }
                Error::Query(err)
            }
            other => other,
        }
    }

    /// Name the field a type error was raised for. Other variants pass through.
    #[must_use]
    pub fn in_field(self, field: &str) -> Self {
        match self {
            Error::Type(err) if err.field.is_none() => Error::Type(err.for_field(field)),
            other => other,
        }
    }

    /// True if this is a constraint violation reported by the engine.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Query(QueryError {
                kind: QueryErrorKind::Constraint,
                ..
            })
        )
    }

    /// The engine's own error text for query and connection failures.
    pub fn engine_message(&self) -> Option<&str> {
        match self {
            Error::Query(err) => Some(&err.message),
            Error::Connection(err) => Some(&err.message),
            _ => None,
        }
    }
}

impl TypeError {
    /// Attach the field name being converted.
    #[must_use]
    pub fn for_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

impl fmt::Display for ConnectionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionErrorKind::Connect => "connect",
            ConnectionErrorKind::Config => "config",
            ConnectionErrorKind::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

impl fmt::Display for QueryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueryErrorKind::Syntax => "syntax",
            QueryErrorKind::Constraint => "constraint",
            QueryErrorKind::Database => "database",
            QueryErrorKind::Unsupported => "unsupported",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(err) => {
                write!(f, "connection error ({}): {}", err.kind, err.message)
            }
            Error::Query(err) => {
                write!(f, "query error ({}): {}", err.kind, err.message)?;
                if let Some(sql) = &err.sql {
                    write!(f, " [sql: {sql}]")?;
                }
                Ok(())
            }
            Error::Schema(err) => write!(f, "schema error in `{}`: {}", err.table, err.message),
            Error::Mapping(msg) => write!(f, "mapping error: {msg}"),
            Error::Type(err) => {
                write!(f, "type error: expected {:?}, found {}", err.expected, err.actual)?;
                if let Some(field) = &err.field {
                    write!(f, " (field `{field}`)")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(ConnectionError {
                source: Some(src), ..
            })
            | Error::Query(QueryError {
                source: Some(src), ..
            }) => Some(src.as_ref()),
            _ => None,
        }
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_sql_only_fills_query_errors() {
        let err = Error::query(QueryErrorKind::Syntax, "near \"FORM\"").with_sql("SELECT * FORM t");
        match &err {
            Error::Query(q) => assert_eq!(q.sql.as_deref(), Some("SELECT * FORM t")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(err.to_string().contains("[sql: SELECT * FORM t]"));

        let err = Error::Mapping("short row".into()).with_sql("SELECT 1");
        assert!(matches!(err, Error::Mapping(_)));
    }

    #[test]
    fn test_constraint_detection() {
        let err = Error::query(QueryErrorKind::Constraint, "UNIQUE constraint failed");
        assert!(err.is_constraint_violation());
        assert_eq!(err.engine_message(), Some("UNIQUE constraint failed"));
        assert!(!Error::Mapping("short row".into()).is_constraint_violation());
    }

    #[test]
    fn test_type_error_display_names_field() {
        let err: Error = TypeError {
            expected: SqlType::BigInt,
            actual: "Text".into(),
            field: None,
        }
        .for_field("age")
        .into();
        let text = err.to_string();
        assert!(text.contains("BigInt"));
        assert!(text.contains("`age`"));
    }

    #[test]
    fn test_in_field_keeps_first_name() {
        let err = Error::Type(TypeError {
            expected: SqlType::Integer,
            actual: "Text".into(),
            field: None,
        })
        .in_field("age")
        .in_field("other");
        match err {
            Error::Type(t) => assert_eq!(t.field.as_deref(), Some("age")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            Error::Mapping("x".into()).in_field("age"),
            Error::Mapping(_)
        ));
    }
}
