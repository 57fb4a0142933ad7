//! SQLite driver for sqlmeta, built on `rusqlite`.
//!
//! [`SqliteConnector`] opens [`SqliteConnection`]s from a
//! [`ConnectionConfig`](sqlmeta_core::ConnectionConfig) whose `database` is
//! a file path, a `file:` URI, or `:memory:`. An in-memory database is
//! private to the connection that opened it, so per-thread clones of an
//! in-memory reference do not share data.
//!
//! Recognised options:
//!
//! | option            | default | effect                                   |
//! |-------------------|---------|------------------------------------------|
//! | `busy_timeout_ms` | `5000`  | how long a writer waits on a locked file |
//! | `journal_mode`    | engine  | `PRAGMA journal_mode`                    |
//! | `foreign_keys`    | `true`  | `PRAGMA foreign_keys`                    |

mod connection;
mod types;

pub use connection::{SqliteConnection, SqliteConnector};
