//! SQLite DDL generator.
//!
//! SQLite only honours `AUTOINCREMENT` on an `INTEGER PRIMARY KEY` column,
//! whatever the declared width of the key.

use sqlmeta_core::{Dialect, FieldInfo, SqlType};

use super::{DdlGenerator, text_type};

/// DDL generator for SQLite.
pub struct SqliteDdlGenerator;

impl DdlGenerator for SqliteDdlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn column_type(&self, field: &FieldInfo) -> String {
        match field.sql_type {
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "REAL".to_string(),
            SqlType::Text => text_type(field),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "DATETIME".to_string(),
        }
    }

    fn auto_increment_key(&self, _field: &FieldInfo) -> String {
        "INTEGER PRIMARY KEY AUTOINCREMENT".to_string()
    }
}
