//! Field (column) descriptors.

use crate::types::SqlType;
use crate::value::Value;

/// Metadata about one model field, mapping to one column.
///
/// Built once when a model type is described, immutable afterwards and
/// owned by the table descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Column name
    pub name: &'static str,
    /// Column kind. For foreign keys this is the related table's key kind.
    pub sql_type: SqlType,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether the database assigns this field's value
    pub auto_increment: bool,
    /// Whether an index is created for this column
    pub index: bool,
    /// Length bound for text columns (`VARCHAR(n)`)
    pub max_length: Option<u32>,
    /// Whether NULL is allowed
    pub nullable: bool,
    /// Whether this column has a unique constraint
    pub unique: bool,
    /// Related table, present iff this field is a foreign key
    pub foreign_model: Option<&'static str>,
    /// In-memory relation name for a foreign key (`team` for `team_id`)
    pub relation: Option<&'static str>,
    /// Key column of the related table
    pub foreign_column: Option<&'static str>,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            auto_increment: false,
            index: false,
            max_length: None,
            nullable: false,
            unique: false,
            foreign_model: None,
            relation: None,
            foreign_column: None,
        }
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set auto-increment flag.
    pub const fn auto_increment(mut self, value: bool) -> Self {
        self.auto_increment = value;
        self
    }

    /// Set index flag.
    pub const fn index(mut self, value: bool) -> Self {
        self.index = value;
        self
    }

    /// Bound the length of a text column.
    pub const fn max_length(mut self, len: u32) -> Self {
        self.max_length = Some(len);
        self
    }

    /// Set the length bound from optional.
    pub const fn max_length_opt(mut self, len: Option<u32>) -> Self {
        self.max_length = len;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set unique flag.
    pub const fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Mark this field as a foreign key.
    ///
    /// `relation` is the name under which the related object is held in
    /// memory, `table` the related model's table.
    pub const fn foreign_key(mut self, relation: &'static str, table: &'static str) -> Self {
        self.relation = Some(relation);
        self.foreign_model = Some(table);
        self
    }

    /// Name the related table's key column.
    pub const fn references(mut self, column: &'static str) -> Self {
        self.foreign_column = Some(column);
        self
    }

    /// True if this field references another table.
    pub const fn is_foreign_key(&self) -> bool {
        self.foreign_model.is_some()
    }

    /// Whether `value` is this field's "no value set" sentinel.
    ///
    /// `Null` always is. For database-assigned keys and for foreign keys an
    /// integer zero also means "not assigned yet".
    pub fn is_unset(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Int(0) | Value::BigInt(0) => self.auto_increment || self.is_foreign_key(),
            _ => false,
        }
    }

    /// Normalize a value for storage.
    ///
    /// An unset value for a nullable field becomes `Null`. Everything else
    /// passes through; a foreign key is expected to already hold the related
    /// row's key. Constraint violations are left for the engine to report.
    pub fn to_database(&self, value: Value) -> Value {
        if self.nullable && self.is_unset(&value) {
            Value::Null
        } else {
            value
        }
    }
}
