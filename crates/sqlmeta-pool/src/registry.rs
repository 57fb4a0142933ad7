//! Connection registry keyed by worker thread.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use sqlmeta_core::{
    Connection, ConnectionConfig, ConnectionErrorKind, ConnectionSource, Connector, Error, Result,
};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(0);

/// Called from a thread-local destructor when a worker thread ends.
trait ThreadExit: Send + Sync {
    fn thread_exited(&self, thread: ThreadId);
}

/// Exit hooks of the current thread, one per registry it used.
struct ExitHooks {
    thread: ThreadId,
    hooks: HashMap<u64, Weak<dyn ThreadExit>>,
}

impl Drop for ExitHooks {
    fn drop(&mut self) {
        for (_, hook) in self.hooks.drain() {
            if let Some(registry) = hook.upgrade() {
                registry.thread_exited(self.thread);
            }
        }
    }
}

thread_local! {
    static EXIT_HOOKS: RefCell<Option<ExitHooks>> = const { RefCell::new(None) };
}

fn register_exit_hook(registry_id: u64, hook: Weak<dyn ThreadExit>) {
    let registered = EXIT_HOOKS.try_with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.get_or_insert_with(|| ExitHooks {
            thread: thread::current().id(),
            hooks: HashMap::new(),
        })
        .hooks
        .entry(registry_id)
        .or_insert(hook);
    });
    if registered.is_err() {
        tracing::debug!(
            registry = registry_id,
            "thread is shutting down, exit hook not registered"
        );
    }
}

/// Hands every worker thread its own connection cloned from a reference
/// configuration.
///
/// Clones are named `"{reference}_{n}"` with `n` counting up from zero for
/// the life of the registry. A thread's clone lives until the thread leaves
/// its [`WorkerGuard`], calls [`thread_finished`](Self::thread_finished), or
/// exits.
pub struct ConnectionRegistry<K: Connector> {
    id: u64,
    connector: K,
    reference: ConnectionConfig,
    connections: Mutex<HashMap<ThreadId, Arc<K::Conn>>>,
    next_id: AtomicU64,
    this: Weak<Self>,
}

impl<K: Connector> ConnectionRegistry<K> {
    /// Create a registry for `reference`.
    ///
    /// Fails when the reference names a driver other than the connector's.
    /// No connection is opened until a thread asks for one.
    pub fn new(connector: K, reference: ConnectionConfig) -> Result<Arc<Self>> {
        if !reference.driver.is_empty() && reference.driver != connector.driver() {
            return Err(Error::connection(
                ConnectionErrorKind::Config,
                format!(
                    "reference `{}` uses driver `{}`, connector is `{}`",
                    reference.name,
                    reference.driver,
                    connector.driver()
                ),
            ));
        }
        Ok(Arc::new_cyclic(|this| Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            connector,
            reference,
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            this: this.clone(),
        }))
    }

    /// The reference configuration clones are opened from.
    pub fn reference(&self) -> &ConnectionConfig {
        &self.reference
    }

    /// The connector clones are opened with.
    pub fn connector(&self) -> &K {
        &self.connector
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ThreadId, Arc<K::Conn>>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// The calling thread's connection, opened on first use.
    pub fn connection_for(&self) -> Result<Arc<K::Conn>> {
        let thread = thread::current().id();
        if let Some(conn) = self.lock().get(&thread) {
            return Ok(Arc::clone(conn));
        }

        let name = format!(
            "{}_{}",
            self.reference.name,
            self.next_id.fetch_add(1, Ordering::Relaxed)
        );
        let opened = match self
            .connector
            .open(&self.reference.renamed(name.as_str()), &name)
        {
            Ok(conn) => Arc::new(conn),
            Err(err) => {
                tracing::warn!(
                    connection = %name,
                    error = %err,
                    "failed to open per-thread connection"
                );
                return Err(err);
            }
        };

        let conn = Arc::clone(self.lock().entry(thread).or_insert(opened));
        let hook: Weak<dyn ThreadExit> = self.this.clone();
        register_exit_hook(self.id, hook);
        tracing::debug!(
            connection = %conn.name(),
            thread = ?thread,
            "opened per-thread connection"
        );
        Ok(conn)
    }

    /// Open the calling thread's connection and scope it to the returned
    /// guard.
    ///
    /// Guards do not nest: dropping any guard releases the thread's clone.
    pub fn enter(&self) -> Result<WorkerGuard<'_, K>> {
        let conn = self.connection_for()?;
        Ok(WorkerGuard {
            registry: self,
            conn,
            _thread_bound: PhantomData,
        })
    }

    /// Release the calling thread's connection. Calling it again, or on a
    /// thread that never asked for one, does nothing.
    pub fn thread_finished(&self) {
        self.release(thread::current().id());
    }

    /// Remove and close the connection of `thread`. Returns whether there
    /// was one.
    pub fn release(&self, thread: ThreadId) -> bool {
        let Some(conn) = self.lock().remove(&thread) else {
            return false;
        };
        tracing::debug!(
            connection = %conn.name(),
            thread = ?thread,
            "released per-thread connection"
        );
        close(&*conn);
        true
    }

    /// Close every connection. Threads that ask again get a fresh clone.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.lock().drain().map(|(_, conn)| conn).collect();
        if !drained.is_empty() {
            tracing::debug!(count = drained.len(), "closing all per-thread connections");
        }
        for conn in drained {
            close(&*conn);
        }
    }

    /// Number of live clones.
    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    /// Whether `thread` currently holds a clone.
    pub fn has_connection(&self, thread: ThreadId) -> bool {
        self.lock().contains_key(&thread)
    }
}

fn close<C: Connection + ?Sized>(conn: &C) {
    if let Err(err) = conn.close() {
        tracing::warn!(
            connection = %conn.name(),
            error = %err,
            "failed to close connection"
        );
    }
}

impl<K: Connector> ThreadExit for ConnectionRegistry<K> {
    fn thread_exited(&self, thread: ThreadId) {
        self.release(thread);
    }
}

impl<K: Connector> ConnectionSource for ConnectionRegistry<K> {
    type Conn = K::Conn;

    fn connection(&self) -> Result<Arc<K::Conn>> {
        self.connection_for()
    }
}

impl<K: Connector> Drop for ConnectionRegistry<K> {
    fn drop(&mut self) {
        self.close_all();
    }
}

impl<K: Connector + std::fmt::Debug> std::fmt::Debug for ConnectionRegistry<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connector", &self.connector)
            .field("reference", &self.reference.name)
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}

/// A worker's claim on its thread's connection. Dropping it releases the
/// connection.
///
/// The guard is bound to the thread that created it.
pub struct WorkerGuard<'r, K: Connector> {
    registry: &'r ConnectionRegistry<K>,
    conn: Arc<K::Conn>,
    _thread_bound: PhantomData<*const ()>,
}

impl<K: Connector> WorkerGuard<'_, K> {
    /// The worker's connection.
    pub fn connection(&self) -> &Arc<K::Conn> {
        &self.conn
    }

    /// The registry the connection belongs to.
    pub fn registry(&self) -> &ConnectionRegistry<K> {
        self.registry
    }
}

impl<K: Connector> ConnectionSource for WorkerGuard<'_, K> {
    type Conn = K::Conn;

    fn connection(&self) -> Result<Arc<K::Conn>> {
        Ok(Arc::clone(&self.conn))
    }
}

impl<K: Connector> Drop for WorkerGuard<'_, K> {
    fn drop(&mut self) {
        self.registry.thread_finished();
    }
}
