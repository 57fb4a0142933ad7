//! Conversions between sqlmeta values and SQLite storage classes.

use rusqlite::ErrorCode;
use rusqlite::types::{Value as SqliteValue, ValueRef};
use sqlmeta_core::error::{ConnectionError, QueryError};
use sqlmeta_core::{ConnectionErrorKind, Error, QueryErrorKind, Result, Value};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Bind form of `value`. Dates and times are stored as ISO-8601 text;
/// `Null` stays SQL NULL.
pub(crate) fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(i64::from(*i)),
        Value::BigInt(i) => SqliteValue::Integer(*i),
        Value::Double(d) => SqliteValue::Real(*d),
        Value::Text(s) => SqliteValue::Text(s.clone()),
        Value::Bytes(b) => SqliteValue::Blob(b.clone()),
        Value::Date(d) => SqliteValue::Text(d.format(DATE_FORMAT).to_string()),
        Value::Time(t) => SqliteValue::Text(t.format(TIME_FORMAT).to_string()),
        Value::Timestamp(ts) => SqliteValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()),
    }
}

/// Column value as read from a result row.
pub(crate) fn from_sqlite(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::BigInt(i),
        ValueRef::Real(d) => Value::Double(d),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| Error::Mapping(format!("column text is not UTF-8: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Bytes(bytes.to_vec()),
    })
}

/// A failed open.
pub(crate) fn connect_error(err: rusqlite::Error, database: &str) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Connect,
        message: format!("cannot open sqlite database `{database}`: {err}"),
        source: Some(Box::new(err)),
    })
}

/// A failure while applying a connection option.
pub(crate) fn option_error(err: rusqlite::Error, option: &str) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Config,
        message: format!("cannot apply sqlite option `{option}`: {err}"),
        source: Some(Box::new(err)),
    })
}

/// Classify a statement failure, keeping the engine's message.
pub(crate) fn query_error(err: rusqlite::Error) -> Error {
    let (kind, message) = match &err {
        rusqlite::Error::SqliteFailure(failure, msg) => {
            let message = msg.clone().unwrap_or_else(|| failure.to_string());
            let kind = match failure.code {
                ErrorCode::ConstraintViolation => QueryErrorKind::Constraint,
                ErrorCode::Unknown if message.contains("syntax error") => QueryErrorKind::Syntax,
                _ => QueryErrorKind::Database,
            };
            (kind, message)
        }
        rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::MultipleStatement => {
            (QueryErrorKind::Syntax, err.to_string())
        }
        _ => (QueryErrorKind::Database, err.to_string()),
    };
    Error::Query(QueryError {
        kind,
        sql: None,
        message,
        source: Some(Box::new(err)),
    })
}
