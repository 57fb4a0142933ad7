//! Model traits and foreign-key references.
//!
//! A model type describes its table once, statically, through [`Model`]
//! (normally generated by `#[derive(Model)]`). Instances are accessed
//! through the object-safe [`Entity`] trait so the mapping engine can walk
//! foreign keys into related models of other types.

use std::any::Any;
use std::fmt;

use crate::error::{Error, Result};
use crate::field::FieldInfo;
use crate::types::{SqlField, SqlType};
use crate::value::Value;

/// Object-safe access to one model instance.
pub trait Entity: Any + Send + Sync {
    /// Table this instance maps to.
    fn table_name(&self) -> &'static str;

    /// Ordered field metadata of the instance's model type.
    fn field_infos(&self) -> Vec<FieldInfo>;

    /// Current value of a local field, by column name.
    fn get_value(&self, field: &str) -> Option<Value>;

    /// Overwrite a local field from a stored value.
    fn set_value(&mut self, field: &str, value: Value) -> Result<()>;

    /// In-memory related object held under a foreign-key relation.
    fn related(&self, _relation: &str) -> Option<&dyn Entity> {
        None
    }

    /// Mutable access to a related object.
    fn related_mut(&mut self, _relation: &str) -> Option<&mut dyn Entity> {
        None
    }

    /// Replace the related object held under `relation`.
    fn set_related(&mut self, relation: &str, _object: Box<dyn Any + Send + Sync>) -> Result<()> {
        Err(Error::Mapping(format!(
            "model `{}` has no relation `{relation}`",
            self.table_name()
        )))
    }

    /// Upcast for downcasting and type identity.
    fn as_any(&self) -> &dyn Any;
}

/// Static description of a model type.
pub trait Model: Entity + Sized {
    /// Table name.
    const TABLE_NAME: &'static str;

    /// Primary key column.
    const PRIMARY_KEY: &'static str;

    /// Column kind of the primary key, used by foreign keys pointing here.
    const PRIMARY_KEY_TYPE: SqlType;

    /// Ordered list of local fields: the schema of this model.
    fn fields() -> Vec<FieldInfo>;
}

/// Value of an instance's primary key, if the model declares one.
pub fn primary_key_value(entity: &dyn Entity) -> Option<Value> {
    entity
        .field_infos()
        .iter()
        .find(|f| f.primary_key)
        .and_then(|f| entity.get_value(f.name))
}

/// A reference to a row of `R`'s table.
///
/// Holds the stored key and, optionally, the related object in memory.
/// Nothing here touches the database: loading the related row on demand is
/// the caller's business, using [`ForeignKey::key`].
pub struct ForeignKey<R> {
    key: Value,
    object: Option<Box<R>>,
}

impl<R> Default for ForeignKey<R> {
    fn default() -> Self {
        Self {
            key: Value::Null,
            object: None,
        }
    }
}

impl<R: Model> ForeignKey<R> {
    /// An unset reference.
    pub fn new() -> Self {
        Self::default()
    }

    /// A reference by key, with nothing loaded.
    pub fn from_key(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            object: None,
        }
    }

    /// A reference holding `object`; the key is taken from it.
    pub fn from_object(object: R) -> Self {
        let mut fk = Self::default();
        fk.set(object);
        fk
    }

    /// Stored key of the related row.
    pub fn key(&self) -> &Value {
        &self.key
    }

    /// Point at another row. A loaded object for a different row is dropped.
    pub fn set_key(&mut self, key: impl Into<Value>) {
        let key = key.into();
        if let Some(object) = &self.object {
            if primary_key_value(&**object).as_ref() != Some(&key) {
                self.object = None;
            }
        }
        self.key = key;
    }

    /// The related object, if loaded.
    pub fn get(&self) -> Option<&R> {
        self.object.as_deref()
    }

    /// Mutable related object, if loaded.
    pub fn get_mut(&mut self) -> Option<&mut R> {
        self.object.as_deref_mut()
    }

    /// Hold `object` in memory and copy its key.
    pub fn set(&mut self, object: R) {
        if let Some(key) = primary_key_value(&object) {
            self.key = key;
        }
        self.object = Some(Box::new(object));
    }

    /// Take the related object out, keeping the key.
    pub fn take(&mut self) -> Option<R> {
        self.object.take().map(|b| *b)
    }

    /// True if the related object is held in memory.
    pub fn is_loaded(&self) -> bool {
        self.object.is_some()
    }

    /// Type-erased [`ForeignKey::set`], used by generated `Entity` impls.
    pub fn set_boxed(&mut self, object: Box<dyn Any + Send + Sync>) -> Result<()> {
        let object = object.downcast::<R>().map_err(|_| {
            Error::Mapping(format!(
                "related object is not a `{}` instance",
                R::TABLE_NAME
            ))
        })?;
        self.set(*object);
        Ok(())
    }

    /// The related object as an entity.
    pub fn as_entity(&self) -> Option<&dyn Entity> {
        self.object.as_deref().map(|o| o as &dyn Entity)
    }

    /// The related object as a mutable entity.
    pub fn as_entity_mut(&mut self) -> Option<&mut dyn Entity> {
        self.object.as_deref_mut().map(|o| o as &mut dyn Entity)
    }
}

impl<R: Model> SqlField for ForeignKey<R> {
    const SQL_TYPE: SqlType = R::PRIMARY_KEY_TYPE;

    fn to_value(&self) -> Value {
        self.key.clone()
    }

    fn from_value(value: Value) -> Result<Self> {
        Ok(Self::from_key(value))
    }

    fn assign(&mut self, value: Value) -> Result<()> {
        self.set_key(value);
        Ok(())
    }
}

impl<R: Clone> Clone for ForeignKey<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            object: self.object.clone(),
        }
    }
}

// Two references are equal when they point at the same row, loaded or not.
impl<R> PartialEq for ForeignKey<R> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<R> fmt::Debug for ForeignKey<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignKey")
            .field("key", &self.key)
            .field("loaded", &self.object.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Team {
        id: i64,
        name: String,
    }

    impl Entity for Team {
        fn table_name(&self) -> &'static str {
            Self::TABLE_NAME
        }

        fn field_infos(&self) -> Vec<FieldInfo> {
            Self::fields()
        }

        fn get_value(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(self.id.to_value()),
                "name" => Some(self.name.to_value()),
                _ => None,
            }
        }

        fn set_value(&mut self, field: &str, value: Value) -> Result<()> {
            match field {
                "id" => self.id.assign(value),
                "name" => self.name.assign(value),
                _ => Err(Error::unknown_field(Self::TABLE_NAME, field)),
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Model for Team {
        const TABLE_NAME: &'static str = "team";
        const PRIMARY_KEY: &'static str = "id";
        const PRIMARY_KEY_TYPE: SqlType = SqlType::BigInt;

        fn fields() -> Vec<FieldInfo> {
            vec![
                FieldInfo::new("id", SqlType::BigInt)
                    .primary_key(true)
                    .auto_increment(true),
                FieldInfo::new("name", SqlType::Text),
            ]
        }
    }

    #[test]
    fn test_set_copies_key_from_object() {
        let mut fk = ForeignKey::<Team>::new();
        assert!(fk.key().is_null());
        fk.set(Team {
            id: 7,
            name: "red".into(),
        });
        assert_eq!(fk.key(), &Value::BigInt(7));
        assert!(fk.is_loaded());
        assert_eq!(fk.get().map(|t| t.name.as_str()), Some("red"));
    }

    #[test]
    fn test_set_key_keeps_matching_object_only() {
        let mut fk = ForeignKey::from_object(Team {
            id: 7,
            name: "red".into(),
        });
        fk.set_key(7_i64);
        assert!(fk.is_loaded());
        fk.set_key(8_i64);
        assert!(!fk.is_loaded());
        assert_eq!(fk.key(), &Value::BigInt(8));
    }

    #[test]
    fn test_set_boxed_rejects_wrong_type() {
        let mut fk = ForeignKey::<Team>::new();
        assert!(fk.set_boxed(Box::new(42_u32)).is_err());
        fk.set_boxed(Box::new(Team {
            id: 1,
            name: "blue".into(),
        }))
        .unwrap();
        assert_eq!(fk.key(), &Value::BigInt(1));
    }

    #[test]
    fn test_equality_compares_keys() {
        let loaded = ForeignKey::from_object(Team {
            id: 3,
            name: "x".into(),
        });
        let by_key = ForeignKey::<Team>::from_key(3_i64);
        assert_eq!(loaded, by_key);
    }

    #[test]
    fn test_sql_type_follows_related_key() {
        assert_eq!(<ForeignKey<Team> as SqlField>::SQL_TYPE, SqlType::BigInt);
    }

    #[test]
    fn test_primary_key_value() {
        let team = Team {
            id: 11,
            name: "green".into(),
        };
        assert_eq!(primary_key_value(&team), Some(Value::BigInt(11)));
    }
}
