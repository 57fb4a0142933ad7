//! Table descriptors: per-model metadata and the row mapping engine.
//!
//! A [`TableDescriptor`] is built once per model type from its field list,
//! validated, and then shared read-only. It generates the table's DDL and
//! moves instances in and out of the database: save (INSERT or UPDATE),
//! load from a row cursor, remove, and find by primary key.

use std::any::{Any, TypeId};
use std::collections::HashSet;
use std::sync::Arc;

use sqlmeta_core::{
    Connection, ConnectionSource, Dialect, Entity, Error, FieldInfo, Model, Result, Value,
    is_valid_identifier, quote_ident,
};
use sqlmeta_query::{
    DeleteStatement, InsertStatement, QueryExecutor, SelectStatement, UpdateStatement,
};

use crate::cache;
use crate::ddl::generator_for;

/// Immutable description of one table.
///
/// Cloning is cheap: all clones share the same contents.
#[derive(Debug, Clone)]
pub struct TableDescriptor {
    inner: Arc<DescriptorInner>,
}

#[derive(Debug)]
struct DescriptorInner {
    table: &'static str,
    type_name: &'static str,
    type_id: Option<TypeId>,
    fields: Vec<FieldInfo>,
    primary_key: usize,
}

impl TableDescriptor {
    /// Describe model type `M`. Prefer [`cache::descriptor`], which builds
    /// each descriptor once.
    pub fn of<M: Model>() -> Result<Self> {
        Self::from_parts(
            M::TABLE_NAME,
            std::any::type_name::<M>(),
            Some(TypeId::of::<M>()),
            M::fields(),
        )
    }

    /// Describe the model type of `entity`.
    pub fn of_entity(entity: &dyn Entity) -> Result<Self> {
        Self::from_parts(
            entity.table_name(),
            entity.table_name(),
            Some(entity.as_any().type_id()),
            entity.field_infos(),
        )
    }

    /// Validate a field list and build a descriptor from it.
    ///
    /// Without a `type_id` the descriptor accepts instances of any type;
    /// this is only useful for DDL generation.
    pub fn from_parts(
        table: &'static str,
        type_name: &'static str,
        type_id: Option<TypeId>,
        fields: Vec<FieldInfo>,
    ) -> Result<Self> {
        let primary_key = validate(table, &fields)?;
        Ok(Self {
            inner: Arc::new(DescriptorInner {
                table,
                type_name,
                type_id,
                fields,
                primary_key,
            }),
        })
    }

    /// Table name.
    pub fn table(&self) -> &'static str {
        self.inner.table
    }

    /// Rust type this descriptor was built from.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name
    }

    /// `TypeId` of the described model, if known.
    pub fn type_id(&self) -> Option<TypeId> {
        self.inner.type_id
    }

    /// Ordered local fields: one per column.
    pub fn local_fields(&self) -> &[FieldInfo] {
        &self.inner.fields
    }

    /// Foreign keys as `(relation, related table)`, in field order.
    pub fn foreign_fields(&self) -> Vec<(&'static str, &'static str)> {
        self.inner
            .fields
            .iter()
            .filter_map(|f| Some((f.relation?, f.foreign_model?)))
            .collect()
    }

    /// The primary key field.
    pub fn primary_key(&self) -> &FieldInfo {
        &self.inner.fields[self.inner.primary_key]
    }

    /// Field by column name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.inner.fields.iter().find(|f| f.name == name)
    }

    /// Foreign-key field holding `relation`.
    fn relation_field(&self, relation: &str) -> Result<&FieldInfo> {
        self.inner
            .fields
            .iter()
            .find(|f| f.relation == Some(relation))
            .ok_or_else(|| {
                Error::Mapping(format!(
                    "table `{}` has no foreign key `{relation}`",
                    self.table()
                ))
            })
    }

    /// Qualified column list (`"t"."a", "t"."b"`) for composing joined
    /// SELECTs whose rows are then read with [`load`](Self::load).
    pub fn column_list(&self, dialect: Dialect) -> String {
        let table = quote_ident(self.table(), dialect);
        self.inner
            .fields
            .iter()
            .map(|f| format!("{table}.{}", quote_ident(f.name, dialect)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Statements creating the table and its indexes.
    pub fn create_table_sql(&self, dialect: Dialect) -> Vec<String> {
        let stmts = generator_for(dialect).create_table(self);
        tracing::debug!(
            table = self.table(),
            ?dialect,
            statements = ?stmts,
            "generated DDL"
        );
        stmts
    }

    /// Statements dropping the table.
    pub fn drop_table_sql(&self, dialect: Dialect) -> Vec<String> {
        generator_for(dialect).drop_table(self)
    }

    /// Create the table and its indexes. The first failing statement
    /// aborts and is returned.
    pub fn create_table<S: ConnectionSource + ?Sized>(&self, source: &S) -> Result<()> {
        let conn = source.connection()?;
        let mut exec = QueryExecutor::new(&*conn);
        for sql in self.create_table_sql(conn.dialect()) {
            exec.exec_sql(sql)?;
        }
        Ok(())
    }

    /// Drop the table.
    pub fn drop_table<S: ConnectionSource + ?Sized>(&self, source: &S) -> Result<()> {
        let conn = source.connection()?;
        let mut exec = QueryExecutor::new(&*conn);
        for sql in self.drop_table_sql(conn.dialect()) {
            exec.exec_sql(sql)?;
        }
        Ok(())
    }

    fn check_instance(&self, entity: &dyn Entity) -> Result<()> {
        match self.inner.type_id {
            Some(expected) if expected != entity.as_any().type_id() => {
                Err(Error::Mapping(format!(
                    "instance of table `{}` passed to descriptor of `{}`",
                    entity.table_name(),
                    self.table()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Current value of `field` on `entity`, `Null` if it has none.
    fn value_of(entity: &dyn Entity, field: &FieldInfo) -> Value {
        entity.get_value(field.name).unwrap_or_default()
    }

    /// Store `instance`.
    ///
    /// Related objects held in memory are resolved first: one without a key
    /// yet is saved, then its key is copied into the foreign-key column.
    /// An instance whose primary key is set is updated if its row exists;
    /// anything else is inserted and receives the database-assigned key.
    pub fn save<S: ConnectionSource + ?Sized>(
        &self,
        source: &S,
        instance: &mut dyn Entity,
    ) -> Result<()> {
        self.check_instance(instance)?;
        let conn = source.connection()?;
        self.save_on(&*conn, instance)
    }

    fn save_on<C: Connection + ?Sized>(&self, conn: &C, instance: &mut dyn Entity) -> Result<()> {
        self.resolve_foreign_keys(conn, instance)?;

        let dialect = conn.dialect();
        let table = self.table();
        let pk = self.primary_key();
        let pk_value = Self::value_of(instance, pk);
        let mut exec = QueryExecutor::new(conn);

        if !pk.is_unset(&pk_value) {
            let (sql, params) =
                SelectStatement::exists(table, pk.name, pk_value.clone()).build(dialect);
            exec.prepare(sql).bind_all(params);
            exec.exec()?;

            if exec.next_row().is_some() {
                let mut update = UpdateStatement::new(table, pk.name, pk_value);
                for field in self.local_fields().iter().filter(|f| !f.primary_key) {
                    let value = field.to_database(Self::value_of(instance, field));
                    update = update.set(field.name, value);
                }
                if update.is_empty() {
                    return Ok(());
                }
                let (sql, params) = update.build(dialect);
                exec.prepare(sql).bind_all(params);
                exec.exec()?;
                tracing::debug!(table = %table, "updated row");
                return Ok(());
            }
        }

        let assigns_key = pk.auto_increment && pk.is_unset(&pk_value);
        let mut insert = InsertStatement::new(table);
        for field in self.local_fields() {
            let value = Self::value_of(instance, field);
            if field.auto_increment && field.is_unset(&value) {
                continue;
            }
            insert = insert.value(field.name, field.to_database(value));
        }
        if assigns_key && dialect == Dialect::Postgres {
            insert = insert.returning(pk.name);
        }
        let (sql, params) = insert.build(dialect);
        exec.prepare(sql).bind_all(params);
        exec.exec()?;

        if assigns_key {
            let id = exec
                .last_insert_id()
                .map(Value::BigInt)
                .or_else(|| exec.rows().first().and_then(|row| row.get(0).cloned()))
                .ok_or_else(|| {
                    Error::Mapping(format!("engine assigned no key to new row of `{table}`"))
                })?;
            tracing::debug!(table = %table, id = %id, "inserted row");
            instance.set_value(pk.name, id)?;
        } else {
            tracing::debug!(table = %table, "inserted row");
        }
        Ok(())
    }

    fn resolve_foreign_keys<C: Connection + ?Sized>(
        &self,
        conn: &C,
        instance: &mut dyn Entity,
    ) -> Result<()> {
        for field in self.local_fields().iter().filter(|f| f.is_foreign_key()) {
            let Some(relation) = field.relation else {
                continue;
            };
            let key = {
                let Some(related) = instance.related_mut(relation) else {
                    continue;
                };
                let descriptor = cache::descriptor_for(related)?;
                let related_pk = descriptor.primary_key();
                if related_pk.is_unset(&Self::value_of(related, related_pk)) {
                    descriptor.save_on(conn, related)?;
                }
                Self::value_of(related, related_pk)
            };
            instance.set_value(field.name, key)?;
        }
        Ok(())
    }

    /// Fill `instance` from `values`, starting at `*cursor`.
    ///
    /// Consumes exactly one value per local field, in field order, and
    /// advances the cursor past them, so several tables can be read from
    /// one joined row. The cursor is left untouched on error.
    pub fn load(
        &self,
        instance: &mut dyn Entity,
        values: &[Value],
        cursor: &mut usize,
    ) -> Result<()> {
        self.check_instance(instance)?;
        let count = self.inner.fields.len();
        let start = *cursor;
        let Some(slice) = start
            .checked_add(count)
            .and_then(|end| values.get(start..end))
        else {
            return Err(Error::Mapping(format!(
                "table `{}` needs {count} values from position {start}, row has {}",
                self.table(),
                values.len()
            )));
        };

        for (field, value) in self.inner.fields.iter().zip(slice) {
            instance.set_value(field.name, value.clone())?;
        }
        *cursor = start + count;
        Ok(())
    }

    /// Delete the row of `instance`. Returns whether a row was deleted.
    pub fn remove<S: ConnectionSource + ?Sized>(
        &self,
        source: &S,
        instance: &dyn Entity,
    ) -> Result<bool> {
        self.check_instance(instance)?;
        let conn = source.connection()?;
        let pk = self.primary_key();
        let (sql, params) = DeleteStatement::new(self.table(), pk.name, Self::value_of(instance, pk))
            .build(conn.dialect());

        let mut exec = QueryExecutor::new(&*conn);
        exec.prepare(sql).bind_all(params);
        exec.exec()?;
        Ok(exec.rows_affected() > 0)
    }

    /// Load the row whose primary key is `key` into a fresh `M`.
    ///
    /// This is how a foreign key that only holds a key is followed.
    pub fn find<M, S>(&self, source: &S, key: impl Into<Value>) -> Result<Option<M>>
    where
        M: Model + Default,
        S: ConnectionSource + ?Sized,
    {
        if self.inner.type_id.is_some_and(|id| id != TypeId::of::<M>()) {
            return Err(Error::Mapping(format!(
                "`{}` is not the model of table `{}`",
                std::any::type_name::<M>(),
                self.table()
            )));
        }

        let conn = source.connection()?;
        let columns = self.inner.fields.iter().map(|f| f.name);
        let (sql, params) = SelectStatement::new(self.table(), columns)
            .by_key(self.primary_key().name, key)
            .build(conn.dialect());

        let mut exec = QueryExecutor::new(&*conn);
        exec.prepare(sql).bind_all(params);
        exec.exec()?;

        let Some(row) = exec.next_row() else {
            return Ok(None);
        };
        let mut model = M::default();
        self.load(&mut model, row.values(), &mut 0)?;
        Ok(Some(model))
    }

    /// The related object held under `relation`, if loaded. No database
    /// access.
    pub fn foreign_key<'a>(
        &self,
        instance: &'a dyn Entity,
        relation: &str,
    ) -> Result<Option<&'a dyn Entity>> {
        self.relation_field(relation)?;
        Ok(instance.related(relation))
    }

    /// Hold `object` under `relation` and copy its key into the column.
    /// No database access.
    pub fn set_foreign_key(
        &self,
        instance: &mut dyn Entity,
        relation: &str,
        object: Box<dyn Any + Send + Sync>,
    ) -> Result<()> {
        let field = self.relation_field(relation)?;
        instance.set_related(relation, object)?;

        let key = instance.related(relation).and_then(|related| {
            let pk = related
                .field_infos()
                .into_iter()
                .find(|f| f.primary_key)?;
            let value = related.get_value(pk.name)?;
            (!pk.is_unset(&value)).then_some(value)
        });
        if let Some(key) = key {
            instance.set_value(field.name, key)?;
        }
        Ok(())
    }
}

/// Check a field list; returns the index of the primary key.
fn validate(table: &str, fields: &[FieldInfo]) -> Result<usize> {
    let fail = |message: String| Err(Error::schema(table, message));

    if !is_valid_identifier(table) {
        return fail(format!("`{table}` is not a valid table name"));
    }
    if fields.is_empty() {
        return fail("model declares no fields".to_string());
    }

    let mut seen = HashSet::new();
    let mut primary_key = None;
    for (idx, field) in fields.iter().enumerate() {
        if !is_valid_identifier(field.name) {
            return fail(format!("`{}` is not a valid column name", field.name));
        }
        if !seen.insert(field.name) {
            return fail(format!("duplicate column `{}`", field.name));
        }
        if field.primary_key {
            if primary_key.is_some() {
                return fail("more than one primary key".to_string());
            }
            primary_key = Some(idx);
        }
        if field.auto_increment && !(field.primary_key && field.sql_type.is_integer()) {
            return fail(format!(
                "`{}`: only an integer primary key can be auto-increment",
                field.name
            ));
        }
        if field.max_length.is_some() && field.sql_type != sqlmeta_core::SqlType::Text {
            return fail(format!("`{}`: max_length applies to text columns only", field.name));
        }
        match (field.relation, field.foreign_model) {
            (None, None) => {}
            (Some(relation), Some(related)) => {
                if !is_valid_identifier(relation) || !is_valid_identifier(related) {
                    return fail(format!("`{}`: invalid foreign key target", field.name));
                }
            }
            _ => {
                return fail(format!(
                    "`{}`: a foreign key needs both a relation and a table",
                    field.name
                ));
            }
        }
    }

    match primary_key {
        Some(idx) => Ok(idx),
        None => fail("no primary key".to_string()),
    }
}
