//! Application entry point: registered models over a connection registry.

use std::any::TypeId;
use std::sync::{Arc, PoisonError, RwLock};

use sqlmeta_core::{ConnectionConfig, Connector, Model, Result, Value};
use sqlmeta_pool::{ConnectionRegistry, WorkerGuard};
use sqlmeta_query::QueryExecutor;
use sqlmeta_schema::{TableDescriptor, descriptor};

/// A database reached through per-thread connections, with the set of model
/// types the application maps onto it.
///
/// Every operation runs on the calling thread's connection. Share a
/// `Database` between workers by reference or in an `Arc`.
pub struct Database<K: Connector> {
    registry: Arc<ConnectionRegistry<K>>,
    models: RwLock<Vec<TableDescriptor>>,
}

impl<K: Connector> Database<K> {
    /// Create a database over `reference`. No connection is opened yet.
    pub fn open(connector: K, reference: ConnectionConfig) -> Result<Self> {
        let registry = ConnectionRegistry::new(connector, reference)?;
        Ok(Self::with_registry(registry))
    }

    /// Create a database over an existing registry.
    pub fn with_registry(registry: Arc<ConnectionRegistry<K>>) -> Self {
        Self {
            registry,
            models: RwLock::new(Vec::new()),
        }
    }

    /// The connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry<K>> {
        &self.registry
    }

    /// The calling thread's connection.
    pub fn connection(&self) -> Result<Arc<K::Conn>> {
        self.registry.connection_for()
    }

    /// Scope the calling thread's connection to the returned guard.
    pub fn enter(&self) -> Result<WorkerGuard<'_, K>> {
        self.registry.enter()
    }

    /// Release the calling thread's connection.
    pub fn thread_finished(&self) {
        self.registry.thread_finished();
    }

    /// Add model `M` to the tables this database manages. Registering a
    /// model twice keeps its first position.
    pub fn register<M: Model>(&self) -> Result<TableDescriptor> {
        let desc = descriptor::<M>()?;
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        if !models
            .iter()
            .any(|m| m.type_id() == Some(TypeId::of::<M>()))
        {
            tracing::debug!(table = desc.table(), model = desc.type_name(), "registered model");
            models.push(desc.clone());
        }
        Ok(desc)
    }

    /// Descriptors of the registered models, in registration order.
    pub fn models(&self) -> Vec<TableDescriptor> {
        self.models
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Create every registered table, in registration order. Register
    /// referenced models before the models that point at them.
    ///
    /// Fails with the engine's error on the first table that already
    /// exists; tables created before it are kept.
    pub fn create_tables(&self) -> Result<()> {
        let models = self.models();
        for desc in &models {
            desc.create_table(self.registry.as_ref())?;
        }
        tracing::info!(tables = models.len(), "created tables");
        Ok(())
    }

    /// Drop every registered table, in reverse registration order. Fails
    /// with the engine's error on the first table that does not exist.
    pub fn drop_tables(&self) -> Result<()> {
        let models = self.models();
        for desc in models.iter().rev() {
            desc.drop_table(self.registry.as_ref())?;
        }
        tracing::info!(tables = models.len(), "dropped tables");
        Ok(())
    }

    /// Insert or update `instance`, saving unsaved related objects first.
    pub fn save<M: Model>(&self, instance: &mut M) -> Result<()> {
        descriptor::<M>()?.save(self.registry.as_ref(), instance)
    }

    /// Delete the row of `instance`. Returns whether a row was deleted.
    pub fn remove<M: Model>(&self, instance: &M) -> Result<bool> {
        descriptor::<M>()?.remove(self.registry.as_ref(), instance)
    }

    /// The `M` whose primary key is `key`, if any.
    pub fn find<M: Model + Default>(&self, key: impl Into<Value>) -> Result<Option<M>> {
        descriptor::<M>()?.find(self.registry.as_ref(), key)
    }

    /// Fill `instance` from `values` at `cursor`, advancing the cursor.
    pub fn load<M: Model>(
        &self,
        instance: &mut M,
        values: &[Value],
        cursor: &mut usize,
    ) -> Result<()> {
        descriptor::<M>()?.load(instance, values, cursor)
    }

    /// Run `f` with an executor on the calling thread's connection.
    pub fn with_executor<T>(
        &self,
        f: impl FnOnce(&mut QueryExecutor<'_, K::Conn>) -> Result<T>,
    ) -> Result<T> {
        let conn = self.connection()?;
        let mut exec = QueryExecutor::new(&*conn);
        f(&mut exec)
    }

    /// Close every connection. Threads that continue get fresh ones.
    pub fn close(&self) {
        self.registry.close_all();
    }
}

impl<K: Connector> std::fmt::Debug for Database<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables: Vec<_> = self.models().iter().map(TableDescriptor::table).collect();
        f.debug_struct("Database")
            .field("reference", &self.registry.reference().name)
            .field("tables", &tables)
            .finish_non_exhaustive()
    }
}
