//! Models and a temp-file SQLite database shared by the end-to-end tests.

#![allow(dead_code)]

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use sqlmeta::prelude::*;
use sqlmeta::{Dialect, SqliteConnector};
use tempfile::TempDir;

#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Team {
    pub id: i64,
    #[sqlmeta(max_length = 50, unique)]
    pub name: String,
}

#[derive(Debug, Default, Model)]
pub struct Player {
    pub id: i64,
    #[sqlmeta(index)]
    pub name: String,
    pub nickname: Option<String>,
    pub score: Option<i32>,
    pub team: ForeignKey<Team>,
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
#[sqlmeta(table = "tag")]
pub struct Tag {
    #[sqlmeta(primary_key)]
    pub label: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Model)]
pub struct Sample {
    pub id: i64,
    pub flag: bool,
    pub small: i32,
    pub big: i64,
    pub ratio: f64,
    pub label: String,
    pub data: Vec<u8>,
    pub note: Option<String>,
    pub day: Option<NaiveDate>,
    pub at: Option<NaiveDateTime>,
}

#[derive(Debug, Default, Model)]
pub struct Event {
    pub id: i64,
    pub happened: Option<DateTime<Local>>,
}

/// A fresh database in a temp directory with every model's table created.
/// Keep the directory alive as long as the database.
pub fn database() -> (TempDir, Database<SqliteConnector>) {
    database_with(|config| config)
}

/// Like [`database`], letting the caller adjust the reference config.
pub fn database_with(
    adjust: impl FnOnce(ConnectionConfig) -> ConnectionConfig,
) -> (TempDir, Database<SqliteConnector>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.db");
    let config = ConnectionConfig::new("sqlite")
        .name("app")
        .database(path.to_string_lossy().into_owned());
    let db = Database::open(SqliteConnector, adjust(config)).unwrap();
    db.register::<Team>().unwrap();
    db.register::<Player>().unwrap();
    db.register::<Tag>().unwrap();
    db.register::<Sample>().unwrap();
    db.register::<Event>().unwrap();
    db.create_tables().unwrap();
    (dir, db)
}

/// Rows of a raw query on the calling thread's connection.
pub fn query(db: &Database<SqliteConnector>, sql: &str, params: Vec<Value>) -> Vec<Row> {
    db.with_executor(|exec| {
        exec.prepare(sql).bind_all(params);
        exec.exec()?;
        Ok(exec.rows().to_vec())
    })
    .unwrap()
}

/// `SELECT COUNT(*)` of `table`.
pub fn count(db: &Database<SqliteConnector>, table: &str) -> i64 {
    let sql = format!(
        "SELECT COUNT(*) AS n FROM {}",
        sqlmeta::crates::core::quote_ident(table, Dialect::Sqlite)
    );
    query(db, &sql, Vec::new())[0]
        .get(0)
        .and_then(Value::as_i64)
        .unwrap()
}
