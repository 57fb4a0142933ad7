//! Per-thread connection registry for sqlmeta.
//!
//! A [`ConnectionRegistry`] holds one reference [`ConnectionConfig`] and
//! hands every worker thread its own connection cloned from it. Clones are
//! released when the worker leaves a [`WorkerGuard`], when
//! [`ConnectionRegistry::thread_finished`] is called, or at the latest when
//! the thread exits.
//!
//! ```ignore
//! let registry = ConnectionRegistry::new(SqliteConnector, config)?;
//! std::thread::scope(|s| {
//!     s.spawn(|| {
//!         let worker = registry.enter()?;
//!         worker.connection().execute("DELETE FROM job", &[])?;
//!         Ok::<_, sqlmeta_core::Error>(())
//!     });
//! });
//! ```
//!
//! [`ConnectionConfig`]: sqlmeta_core::ConnectionConfig

mod registry;

pub use registry::{ConnectionRegistry, WorkerGuard};
