//! Statement execution for sqlmeta.
//!
//! `sqlmeta-query` sits between the mapping engine and the drivers:
//!
//! - [`QueryExecutor`] runs one statement at a time on a [`Connection`],
//!   binding parameters positionally and in order, logging every statement
//!   and keeping the engine's message when one fails.
//! - The statement builders ([`InsertStatement`], [`UpdateStatement`],
//!   [`DeleteStatement`], [`SelectStatement`]) render the single-table DML
//!   the mapping engine issues, for any supported [`Dialect`].
//!
//! [`Connection`]: sqlmeta_core::Connection
//! [`Dialect`]: sqlmeta_core::Dialect

pub mod executor;
pub mod statement;

pub use executor::QueryExecutor;
pub use statement::{DeleteStatement, InsertStatement, SelectStatement, UpdateStatement};
