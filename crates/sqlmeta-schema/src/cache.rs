//! Process-wide descriptor cache.
//!
//! Descriptors are built outside the lock and published with
//! insert-if-absent: every reader sees either no descriptor or a complete
//! one, and concurrent first uses of a model all end up sharing the first
//! published descriptor.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{LazyLock, PoisonError, RwLock};

use sqlmeta_core::{Entity, Error, Model, Result};

use crate::descriptor::TableDescriptor;

#[derive(Default)]
struct Registry {
    by_type: HashMap<TypeId, TableDescriptor>,
    by_table: HashMap<&'static str, TypeId>,
}

static CACHE: LazyLock<RwLock<Registry>> = LazyLock::new(|| RwLock::new(Registry::default()));

fn cached(type_id: TypeId) -> Option<TableDescriptor> {
    CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_type
        .get(&type_id)
        .cloned()
}

fn publish(type_id: TypeId, descriptor: TableDescriptor) -> Result<TableDescriptor> {
    let mut registry = CACHE.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = registry.by_type.get(&type_id) {
        return Ok(existing.clone());
    }
    if let Some(owner) = registry.by_table.get(descriptor.table()) {
        if *owner != type_id {
            let owner_name = registry
                .by_type
                .get(owner)
                .map_or("another model", TableDescriptor::type_name);
            return Err(Error::schema(
                descriptor.table(),
                format!(
                    "`{}` and `{owner_name}` both map to this table",
                    descriptor.type_name()
                ),
            ));
        }
    }

    tracing::debug!(
        table = descriptor.table(),
        model = descriptor.type_name(),
        fields = descriptor.local_fields().len(),
        "published table descriptor"
    );
    registry.by_table.insert(descriptor.table(), type_id);
    registry.by_type.insert(type_id, descriptor.clone());
    Ok(descriptor)
}

/// The descriptor of model type `M`, built on first use.
pub fn descriptor<M: Model>() -> Result<TableDescriptor> {
    let type_id = TypeId::of::<M>();
    if let Some(found) = cached(type_id) {
        return Ok(found);
    }
    publish(type_id, TableDescriptor::of::<M>()?)
}

/// The descriptor of `entity`'s model type, built on first use.
pub fn descriptor_for(entity: &dyn Entity) -> Result<TableDescriptor> {
    let type_id = entity.as_any().type_id();
    if let Some(found) = cached(type_id) {
        return Ok(found);
    }
    publish(type_id, TableDescriptor::of_entity(entity)?)
}

/// The published descriptor of `table`, if its model has been used.
pub fn descriptor_by_table(table: &str) -> Option<TableDescriptor> {
    let registry = CACHE.read().unwrap_or_else(PoisonError::into_inner);
    let type_id = registry.by_table.get(table)?;
    registry.by_type.get(type_id).cloned()
}

/// Number of published descriptors.
pub fn descriptor_count() -> usize {
    CACHE
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_type
        .len()
}

/// Forget every descriptor. Used on schema teardown; descriptors already
/// handed out stay valid.
pub fn invalidate_all() {
    let mut registry = CACHE.write().unwrap_or_else(PoisonError::into_inner);
    registry.by_type.clear();
    registry.by_table.clear();
    tracing::debug!("descriptor cache cleared");
}
