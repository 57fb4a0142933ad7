//! SQLite connections.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rusqlite::{OpenFlags, params_from_iter};
use sqlmeta_core::{
    Connection, ConnectionConfig, ConnectionErrorKind, Connector, Dialect, Error, Param,
    QueryErrorKind, QueryResult, Result, Row, ensure_input_only,
};

use crate::types::{connect_error, from_sqlite, option_error, query_error, to_sqlite};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MEMORY: &str = ":memory:";
const JOURNAL_MODES: [&str; 6] = ["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

/// Opens [`SqliteConnection`]s. Accepts configurations whose driver is
/// `sqlite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    type Conn = SqliteConnection;

    fn driver(&self) -> &'static str {
        "sqlite"
    }

    fn open(&self, config: &ConnectionConfig, name: &str) -> Result<SqliteConnection> {
        SqliteConnection::open(config, name)
    }
}

/// One SQLite database handle.
///
/// The handle sits behind a mutex so the connection can be shared, though
/// the registry gives each thread its own.
pub struct SqliteConnection {
    name: String,
    conn: Mutex<Option<rusqlite::Connection>>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}

impl SqliteConnection {
    /// Open the database named by `config.database`, applying the
    /// connection options.
    pub fn open(config: &ConnectionConfig, name: &str) -> Result<Self> {
        let database = if config.database.is_empty() {
            MEMORY
        } else {
            config.database.as_str()
        };
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = rusqlite::Connection::open_with_flags(database, flags)
            .map_err(|e| connect_error(e, database))?;
        apply_options(&conn, config)?;

        tracing::debug!(connection = %name, database = %database, "opened sqlite connection");
        Ok(Self {
            name: name.to_string(),
            conn: Mutex::new(Some(conn)),
        })
    }

    /// A private in-memory database.
    pub fn open_in_memory(name: &str) -> Result<Self> {
        Self::open(&ConnectionConfig::new("sqlite").database(MEMORY), name)
    }

    /// Whether the connection has not been closed.
    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<rusqlite::Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn disconnected(&self) -> Error {
        Error::connection(
            ConnectionErrorKind::Disconnected,
            format!("sqlite connection `{}` is closed", self.name),
        )
    }
}

fn apply_options(conn: &rusqlite::Connection, config: &ConnectionConfig) -> Result<()> {
    let busy = config
        .duration_ms_option("busy_timeout_ms")?
        .unwrap_or(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS));
    conn.busy_timeout(busy)
        .map_err(|e| option_error(e, "busy_timeout_ms"))?;

    if let Some(mode) = config.get_option("journal_mode") {
        let mode = mode.to_ascii_uppercase();
        if !JOURNAL_MODES.contains(&mode.as_str()) {
            return Err(Error::connection(
                ConnectionErrorKind::Config,
                format!("unknown sqlite journal_mode `{mode}`"),
            ));
        }
        let applied: String = conn
            .query_row(&format!("PRAGMA journal_mode = {mode}"), [], |row| row.get(0))
            .map_err(|e| option_error(e, "journal_mode"))?;
        tracing::debug!(requested = %mode, applied = %applied, "set sqlite journal mode");
    }

    let foreign_keys = config.bool_option("foreign_keys")?.unwrap_or(true);
    let switch = if foreign_keys { "ON" } else { "OFF" };
    conn.execute_batch(&format!("PRAGMA foreign_keys = {switch}"))
        .map_err(|e| option_error(e, "foreign_keys"))?;
    Ok(())
}

fn is_insert(sql: &str) -> bool {
    let head = sql.trim_start();
    ["INSERT", "REPLACE"].iter().any(|kw| {
        head.get(..kw.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(kw))
    })
}

impl Connection for SqliteConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn run(&self, sql: &str, params: &mut [Param]) -> Result<QueryResult> {
        ensure_input_only(params)?;
        let guard = self.lock();
        let conn = guard.as_ref().ok_or_else(|| self.disconnected())?;

        let mut stmt = conn.prepare(sql).map_err(query_error)?;
        let bound = params_from_iter(params.iter().map(|p| to_sqlite(&p.value)));

        if stmt.column_count() == 0 {
            let affected = stmt.execute(bound).map_err(query_error)?;
            let last_insert_id =
                (is_insert(sql) && affected > 0).then(|| conn.last_insert_rowid());
            return Ok(QueryResult {
                rows: Vec::new(),
                rows_affected: affected as u64,
                last_insert_id,
            });
        }

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let read_only = stmt.readonly();
        let mut out = Vec::new();
        let mut rows = stmt.query(bound).map_err(query_error)?;
        while let Some(row) = rows.next().map_err(query_error)? {
            let values = (0..columns.len())
                .map(|idx| {
                    row.get_ref(idx)
                        .map_err(query_error)
                        .and_then(from_sqlite)
                })
                .collect::<Result<Vec<_>>>()?;
            out.push(Row::new(Arc::clone(&columns), values));
        }

        Ok(QueryResult {
            rows: out,
            rows_affected: if read_only { 0 } else { conn.changes() as u64 },
            last_insert_id: (!read_only && is_insert(sql)).then(|| conn.last_insert_rowid()),
        })
    }

    fn close(&self) -> Result<()> {
        let Some(conn) = self.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, err)| {
            let err = query_error(err);
            tracing::warn!(connection = %self.name, error = %err, "sqlite close failed");
            err
        })?;
        tracing::debug!(connection = %self.name, "closed sqlite connection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlmeta_core::{ParamDirection, Value};

    fn memory() -> SqliteConnection {
        let conn = SqliteConnection::open_in_memory("test_0").unwrap();
        conn.execute(
            "CREATE TABLE item (id INTEGER PRIMARY KEY AUTOINCREMENT, label TEXT, qty INTEGER)",
            &[],
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_insert_reports_rowid() {
        let conn = memory();
        let mut params = vec![Param::input("bolt"), Param::input(4_i64)];
        let result = conn
            .run("INSERT INTO item (label, qty) VALUES (?, ?)", &mut params)
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, Some(1));

        let result = conn
            .run("UPDATE item SET qty = 5", &mut [])
            .unwrap();
        assert_eq!(result.rows_affected, 1);
        assert_eq!(result.last_insert_id, None);
    }

    #[test]
    fn test_null_round_trips_as_null() {
        let conn = memory();
        conn.execute(
            "INSERT INTO item (label, qty) VALUES (?, ?)",
            &[Value::Null, Value::Null],
        )
        .unwrap();
        let rows = conn.query("SELECT label, qty FROM item", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].values(), &[Value::Null, Value::Null]);
        assert_eq!(rows[0].columns(), &["label".to_string(), "qty".to_string()]);
    }

    #[test]
    fn test_returning_rows() {
        let conn = memory();
        let mut params = vec![Param::input("nut")];
        let result = conn
            .run("INSERT INTO item (label) VALUES (?) RETURNING id", &mut params)
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].get(0), Some(&Value::BigInt(1)));
        assert_eq!(result.rows_affected, 1);
    }

    #[test]
    fn test_errors_are_classified() {
        let conn = memory();
        conn.execute("CREATE TABLE uniq (v TEXT UNIQUE)", &[]).unwrap();
        conn.execute("INSERT INTO uniq (v) VALUES ('a')", &[]).unwrap();
        let err = conn
            .execute("INSERT INTO uniq (v) VALUES ('a')", &[])
            .unwrap_err();
        assert!(err.is_constraint_violation());
        assert!(err.engine_message().unwrap().contains("UNIQUE"));

        let err = conn.query("SELEC 1", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Query(ref q) if q.kind == QueryErrorKind::Syntax
        ));

        let err = conn.query("SELECT * FROM missing", &[]).unwrap_err();
        assert!(err.engine_message().unwrap().contains("no such table"));
    }

    #[test]
    fn test_output_params_unsupported() {
        let conn = memory();
        let mut params = vec![Param::new(Value::Null, ParamDirection::Out)];
        let err = conn.run("SELECT ?", &mut params).unwrap_err();
        assert!(matches!(
            err,
            Error::Query(ref q) if q.kind == QueryErrorKind::Unsupported
        ));
    }

    #[test]
    fn test_closed_connection_is_disconnected() {
        let conn = memory();
        conn.close().unwrap();
        assert!(!conn.is_open());
        conn.close().unwrap();
        let err = conn.query("SELECT 1", &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ref c) if c.kind == ConnectionErrorKind::Disconnected
        ));
    }

    #[test]
    fn test_bad_options_are_config_errors() {
        let config = ConnectionConfig::new("sqlite").option("journal_mode", "sideways");
        assert!(matches!(
            SqliteConnection::open(&config, "x"),
            Err(Error::Connection(ref c)) if c.kind == ConnectionErrorKind::Config
        ));

        let config = ConnectionConfig::new("sqlite").option("busy_timeout_ms", "soon");
        assert!(SqliteConnection::open(&config, "x").is_err());
    }

    #[test]
    fn test_is_insert() {
        assert!(is_insert("  insert into t values (1)"));
        assert!(is_insert("REPLACE INTO t VALUES (1)"));
        assert!(!is_insert("UPDATE t SET a = 1"));
        assert!(!is_insert("INS"));
    }
}
