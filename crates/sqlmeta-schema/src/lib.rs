//! Table descriptors for sqlmeta.
//!
//! `sqlmeta-schema` turns the static field lists of `Model` types into
//! [`TableDescriptor`]s and uses them to:
//!
//! - generate `CREATE TABLE` / `CREATE INDEX` / `DROP TABLE` statements for
//!   SQLite, PostgreSQL and MySQL ([`ddl`]);
//! - save, load, remove and find model instances;
//! - share one descriptor per model type across all threads ([`cache`]).
//!
//! Operations take any [`ConnectionSource`](sqlmeta_core::ConnectionSource):
//! the per-thread connection registry in production, a fixed connection in
//! tests.

pub mod cache;
pub mod ddl;
pub mod descriptor;

pub use cache::{descriptor, descriptor_by_table, descriptor_for, invalidate_all};
pub use ddl::{DdlGenerator, generator_for};
pub use descriptor::TableDescriptor;
