//! Core types and traits for sqlmeta.
//!
//! `sqlmeta-core` is the **foundation layer** for the workspace. It defines the
//! traits and data types every other crate builds on.
//!
//! # Role In The Architecture
//!
//! - **Contract layer**: `Model`/`Entity` are implemented by user models (usually
//!   via `#[derive(Model)]`), `Connector`/`Connection` by database drivers.
//! - **Data model**: `Value`, `SqlType`, `FieldInfo` and `Row` describe columns,
//!   bound parameters and results, shared by the query, schema and driver crates.
//! - **Configuration**: `ConnectionConfig` describes the reference connection the
//!   registry clones per worker thread.
//!
//! # Who Uses This Crate
//!
//! - `sqlmeta-macros` generates `Model` and `Entity` implementations defined here.
//! - `sqlmeta-query` executes statements through `Connection`.
//! - `sqlmeta-schema` turns `Model::fields()` into table descriptors.
//! - `sqlmeta-pool` opens per-thread connections through `Connector`.
//! - `sqlmeta-sqlite` implements `Connector` and `Connection`.

pub mod config;
pub mod connection;
pub mod error;
pub mod field;
pub mod identifiers;
pub mod model;
pub mod row;
pub mod types;
pub mod value;

pub use config::ConnectionConfig;
pub use connection::{
    Connection, ConnectionSource, Connector, Dialect, Param, ParamDirection, QueryResult,
    ensure_input_only,
};
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result, SchemaError,
    TypeError,
};
pub use field::FieldInfo;
pub use identifiers::{is_valid_identifier, quote_ident};
pub use model::{Entity, ForeignKey, Model, primary_key_value};
pub use row::Row;
pub use types::{SqlField, SqlType};
pub use value::Value;
