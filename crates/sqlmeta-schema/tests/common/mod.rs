//! Shared test fixtures: a recording stub connection and a few models.

#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use sqlmeta_core::{
    Connection, Dialect, ForeignKey, Param, QueryResult, Result, Row, Value,
};
use sqlmeta_macros::Model;

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
    pub team: ForeignKey<Team>,
}

#[derive(Debug, Default, Model)]
#[sqlmeta(table = "tag")]
pub struct Tag {
    #[sqlmeta(primary_key)]
    pub label: String,
}

/// Records every statement and answers like a tiny in-memory engine:
/// the existence probe and DELETE see `existing` keys, INSERT assigns
/// increasing ids, other SELECTs return `select_rows`.
pub struct StubConnection {
    dialect: Dialect,
    log: Mutex<Vec<(String, Vec<Value>)>>,
    existing: Mutex<Vec<Value>>,
    select_rows: Mutex<Vec<Row>>,
    next_id: AtomicI64,
}

impl StubConnection {
    pub fn new(dialect: Dialect) -> Arc<Self> {
        Arc::new(Self {
            dialect,
            log: Mutex::new(Vec::new()),
            existing: Mutex::new(Vec::new()),
            select_rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        })
    }

    pub fn with_existing(self: Arc<Self>, key: impl Into<Value>) -> Arc<Self> {
        self.existing.lock().unwrap().push(key.into());
        self
    }

    pub fn with_rows(self: Arc<Self>, rows: Vec<Vec<Value>>) -> Arc<Self> {
        *self.select_rows.lock().unwrap() = rows.into_iter().map(row).collect();
        self
    }

    pub fn statements(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(sql, _)| sql.clone()).collect()
    }

    pub fn params(&self, idx: usize) -> Vec<Value> {
        self.log.lock().unwrap()[idx].1.clone()
    }

    fn exists(&self, params: &[Value]) -> bool {
        params
            .first()
            .is_some_and(|key| self.existing.lock().unwrap().contains(key))
    }
}

pub fn row(values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = (0..values.len()).map(|i| format!("c{i}")).collect();
    Row::new(columns, values)
}

impl Connection for StubConnection {
    fn name(&self) -> &str {
        "stub"
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn run(&self, sql: &str, params: &mut [Param]) -> Result<QueryResult> {
        let values: Vec<Value> = params.iter().map(|p| p.value.clone()).collect();
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), values.clone()));

        let mut result = QueryResult::default();
        if sql.starts_with("SELECT 1 AS a") {
            if self.exists(&values) {
                result.rows.push(row(vec![Value::BigInt(1)]));
            }
        } else if sql.starts_with("INSERT") {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            result.rows_affected = 1;
            if sql.contains("RETURNING") {
                result.rows.push(row(vec![Value::BigInt(id)]));
            } else {
                result.last_insert_id = Some(id);
            }
        } else if sql.starts_with("SELECT") {
            result.rows = self.select_rows.lock().unwrap().clone();
        } else if sql.starts_with("DELETE") || sql.starts_with("UPDATE") {
            let key = values.last().cloned().into_iter().collect::<Vec<_>>();
            result.rows_affected = u64::from(self.exists(&key));
        }
        Ok(result)
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}
