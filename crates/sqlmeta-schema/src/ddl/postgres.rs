//! PostgreSQL DDL generator.

use sqlmeta_core::{Dialect, FieldInfo, SqlType};

use super::{DdlGenerator, text_type};

/// DDL generator for PostgreSQL.
pub struct PostgresDdlGenerator;

impl DdlGenerator for PostgresDdlGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn column_type(&self, field: &FieldInfo) -> String {
        match field.sql_type {
            SqlType::Boolean => "BOOLEAN".to_string(),
            SqlType::Integer => "INTEGER".to_string(),
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Double => "DOUBLE PRECISION".to_string(),
            SqlType::Text => text_type(field),
            SqlType::Blob => "BYTEA".to_string(),
            SqlType::Date => "DATE".to_string(),
            SqlType::Time => "TIME".to_string(),
            SqlType::Timestamp => "TIMESTAMP".to_string(),
        }
    }

    fn auto_increment_key(&self, field: &FieldInfo) -> String {
        match field.sql_type {
            SqlType::Integer => "SERIAL PRIMARY KEY".to_string(),
            _ => "BIGSERIAL PRIMARY KEY".to_string(),
        }
    }
}
