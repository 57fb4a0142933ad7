//! MySQL DDL generator.
//!
//! MySQL ignores column-level `REFERENCES`, so foreign keys are written as
//! table constraints. Indexed or unique text columns need a bounded type.

use sqlmeta_core::{Dialect, FieldInfo, SqlType};

use super::{DdlGenerator, text_type};

/// Length used for text columns that must be indexable.
const INDEXED_TEXT_LENGTH: u32 = 255;

/// DDL generator for MySQL.
pub struct MySqlDdlGenerator;

impl DdlGenerator for MySqlDdlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    fn column_type(&self, field: &FieldInfo) -> String {
        match field.sql_type {
            SqlType::Boolean => "BOOL".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Text
                if field.max_length.is_none()
                    && (field.index || field.unique || field.primary_key) =>
            {
                format!("VARCHAR({INDEXED_TEXT_LENGTH})")
            }
            SqlType::Text => text_type(field),
            SqlType::Blob => "BLOB".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "DATETIME".to_string(),
        }
    }

    fn auto_increment_key(&self, field: &FieldInfo) -> String {
        format!("{} NOT NULL PRIMARY KEY AUTO_INCREMENT", self.column_type(field))
    }

    fn inline_references(&self) -> bool {
        false
    }
}
