//! sqlmeta: schema-described models over per-thread SQL connections.
//!
//! `sqlmeta` is the **facade crate** of the workspace. It re-exports what an
//! application needs and adds [`Database`], which ties model registration,
//! table creation and the save/load/remove/find operations to one
//! [`ConnectionRegistry`].
//!
//! # Role In The Architecture
//!
//! - **Models**: `#[derive(Model)]` (from `sqlmeta-macros`) describes a table
//!   at compile time. Derived through this crate, the generated code reaches
//!   `sqlmeta-core` via [`crates::core`], so `sqlmeta` is the only dependency
//!   a model crate needs.
//! - **Mapping**: [`TableDescriptor`] (from `sqlmeta-schema`) generates DDL
//!   and moves instances in and out of rows.
//! - **Connections**: [`ConnectionRegistry`] (from `sqlmeta-pool`) gives
//!   each worker thread its own connection cloned from a reference
//!   configuration.
//! - **Statements**: [`QueryExecutor`] (from `sqlmeta-query`) runs raw SQL
//!   with ordered parameter binding.
//!
//! # Example
//!
//! ```ignore
//! use sqlmeta::prelude::*;
//!
//! #[derive(Debug, Default, Model)]
//! struct Team {
//!     id: i64,
//!     #[sqlmeta(max_length = 50, unique)]
//!     name: String,
//! }
//!
//! let db = Database::open(SqliteConnector, ConnectionConfig::from_url("sqlite://app.db")?)?;
//! db.register::<Team>()?;
//! db.create_tables()?;
//!
//! let mut reds = Team { name: "reds".into(), ..Team::default() };
//! db.save(&mut reds)?;
//! let found: Option<Team> = db.find(reds.id)?;
//! ```

// Lets the derive's `::sqlmeta::...` paths resolve inside this crate too.
extern crate self as sqlmeta;

mod database;

pub use database::Database;

pub use sqlmeta_core::{
    Connection, ConnectionConfig, ConnectionErrorKind, ConnectionSource, Connector, Dialect,
    Entity, Error, FieldInfo, ForeignKey, Model, Param, ParamDirection, QueryErrorKind,
    QueryResult, Result, Row, SqlField, SqlType, Value,
};
pub use sqlmeta_macros::FacadeModel as Model;
pub use sqlmeta_pool::{ConnectionRegistry, WorkerGuard};
pub use sqlmeta_query::QueryExecutor;
pub use sqlmeta_schema::{TableDescriptor, descriptor, descriptor_for};

#[cfg(feature = "sqlite")]
pub use sqlmeta_sqlite::{SqliteConnection, SqliteConnector};

/// Sub-crates, for items the facade does not re-export.
pub mod crates {
    pub use sqlmeta_core as core;
    pub use sqlmeta_pool as pool;
    pub use sqlmeta_query as query;
    pub use sqlmeta_schema as schema;
    #[cfg(feature = "sqlite")]
    pub use sqlmeta_sqlite as sqlite;
}

/// Everything a typical application imports.
pub mod prelude {
    pub use crate::Database;
    pub use sqlmeta_core::{
        ConnectionConfig, Entity, Error, ForeignKey, Model, Result, Row, Value,
    };
    pub use sqlmeta_macros::FacadeModel as Model;
    pub use sqlmeta_query::QueryExecutor;
    pub use sqlmeta_schema::TableDescriptor;

    #[cfg(feature = "sqlite")]
    pub use sqlmeta_sqlite::SqliteConnector;
}
