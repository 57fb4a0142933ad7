//! Column kinds and the mapping between Rust types and [`Value`]s.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::{Result, TypeError};
use crate::value::Value;

/// The closed set of column kinds a field can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    Double,
    Text,
    Blob,
    Date,
    Time,
    /// Date and time, stored in UTC
    Timestamp,
}

impl SqlType {
    /// True for the kinds an auto-increment key may have.
    pub const fn is_integer(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::BigInt)
    }
}

/// A Rust type that can be stored in one column.
///
/// The derive macro emits `<T as SqlField>::SQL_TYPE` for every field, so
/// the schema is fixed at compile time and conversions are explicit.
pub trait SqlField: Sized {
    /// Column kind for this type.
    const SQL_TYPE: SqlType;
    /// Whether the type can represent "no value".
    const NULLABLE: bool = false;

    /// Convert to the storage representation.
    fn to_value(&self) -> Value;

    /// Convert back from the storage representation.
    fn from_value(value: Value) -> Result<Self>;

    /// Overwrite `self` from a stored value.
    ///
    /// Types that carry extra in-memory state (foreign keys) override this
    /// to keep that state when the stored key does not change.
    fn assign(&mut self, value: Value) -> Result<()> {
        *self = Self::from_value(value)?;
        Ok(())
    }
}

fn mismatch(expected: SqlType, actual: &Value) -> crate::Error {
    TypeError {
        expected,
        actual: actual.kind_name().to_string(),
        field: None,
    }
    .into()
}

impl SqlField for bool {
    const SQL_TYPE: SqlType = SqlType::Boolean;

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::BigInt(i) => Ok(i != 0),
            other => Err(mismatch(SqlType::Boolean, &other)),
        }
    }
}

impl SqlField for i32 {
    const SQL_TYPE: SqlType = SqlType::Integer;

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            Value::BigInt(i) => i32::try_from(i).map_err(|_| {
                TypeError {
                    expected: SqlType::Integer,
                    actual: format!("BigInt({i}) out of range"),
                    field: None,
                }
                .into()
            }),
            Value::Bool(b) => Ok(i32::from(b)),
            other => Err(mismatch(SqlType::Integer, &other)),
        }
    }
}

impl SqlField for i64 {
    const SQL_TYPE: SqlType = SqlType::BigInt;

    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i64::from(i)),
            Value::BigInt(i) => Ok(i),
            Value::Bool(b) => Ok(i64::from(b)),
            other => Err(mismatch(SqlType::BigInt, &other)),
        }
    }
}

impl SqlField for f64 {
    const SQL_TYPE: SqlType = SqlType::Double;

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Double(d) => Ok(d),
            Value::Int(i) => Ok(f64::from(i)),
            Value::BigInt(i) => Ok(i as f64),
            other => Err(mismatch(SqlType::Double, &other)),
        }
    }
}

impl SqlField for String {
    const SQL_TYPE: SqlType = SqlType::Text;

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch(SqlType::Text, &other)),
        }
    }
}

impl SqlField for Vec<u8> {
    const SQL_TYPE: SqlType = SqlType::Blob;

    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(mismatch(SqlType::Blob, &other)),
        }
    }
}

impl SqlField for NaiveDate {
    const SQL_TYPE: SqlType = SqlType::Date;

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::Text(ref s) => {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch(SqlType::Date, &value))
            }
            other => Err(mismatch(SqlType::Date, &other)),
        }
    }
}

impl SqlField for NaiveTime {
    const SQL_TYPE: SqlType = SqlType::Time;

    fn to_value(&self) -> Value {
        Value::Time(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Time(t) => Ok(t),
            Value::Text(ref s) => {
                NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|_| mismatch(SqlType::Time, &value))
            }
            other => Err(mismatch(SqlType::Time, &other)),
        }
    }
}

impl SqlField for NaiveDateTime {
    const SQL_TYPE: SqlType = SqlType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(ref s) => crate::value::parse_timestamp(s)
                .ok_or_else(|| mismatch(SqlType::Timestamp, &value)),
            other => Err(mismatch(SqlType::Timestamp, &other)),
        }
    }
}

impl SqlField for DateTime<Utc> {
    const SQL_TYPE: SqlType = SqlType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self> {
        NaiveDateTime::from_value(value).map(|naive| naive.and_utc())
    }
}

// Local times are normalised to UTC on the way in, so a table never holds a
// mix of local and UTC timestamps.
impl SqlField for DateTime<Local> {
    const SQL_TYPE: SqlType = SqlType::Timestamp;

    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }

    fn from_value(value: Value) -> Result<Self> {
        NaiveDateTime::from_value(value).map(|naive| naive.and_utc().with_timezone(&Local))
    }
}

impl<T: SqlField> SqlField for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
