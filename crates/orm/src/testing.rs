//! Recording driver used by the unit tests

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::backends::{DatabaseValue, Driver, DriverTransaction, ParamKind, Row};
use crate::binding::{BindingEntry, Bindings};
use crate::error::{ModelError, ModelResult};

/// One statement as it reached the driver
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Executed {
    pub sql: String,
    pub bindings: Vec<BindingEntry>,
}

impl Executed {
    pub fn value_of(&self, placeholder: &str) -> Option<&DatabaseValue> {
        self.bindings
            .iter()
            .find(|b| b.placeholder == placeholder)
            .map(|b| &b.value)
    }

    pub fn placeholders(&self) -> Vec<&str> {
        self.bindings.iter().map(|b| b.placeholder.as_str()).collect()
    }
}

#[derive(Debug, Default)]
struct SpyState {
    log: Vec<String>,
    executed: Vec<Executed>,
    fetches: Vec<(String, Bindings)>,
    rows: Vec<Row>,
    last_inserted: Vec<Row>,
    fail_execute: Option<ModelError>,
    fail_commit: Option<ModelError>,
}

/// Driver that records everything and returns canned rows
#[derive(Debug, Clone, Default)]
pub(crate) struct SpyDriver {
    state: Arc<Mutex<SpyState>>,
}

impl SpyDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by `last_inserted_row`
    pub fn with_last_inserted(self, rows: Vec<Row>) -> Self {
        self.state.lock().unwrap().last_inserted = rows;
        self
    }

    /// Rows returned by `fetch_all`
    pub fn with_rows(self, rows: Vec<Row>) -> Self {
        self.state.lock().unwrap().rows = rows;
        self
    }

    pub fn failing_execute(self, error: ModelError) -> Self {
        self.state.lock().unwrap().fail_execute = Some(error);
        self
    }

    pub fn failing_commit(self, error: ModelError) -> Self {
        self.state.lock().unwrap().fail_commit = Some(error);
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn fetches(&self) -> Vec<(String, Bindings)> {
        self.state.lock().unwrap().fetches.clone()
    }

    /// `begin`, `execute: <sql>`, `commit`, `rollback`, `fetch: <sql>`, `last_inserted: <table>`
    pub fn log(&self) -> Vec<String> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|e| e.as_str() == entry)
            .count()
    }
}

#[async_trait]
impl Driver for SpyDriver {
    async fn begin(&self) -> ModelResult<Box<dyn DriverTransaction>> {
        self.state.lock().unwrap().log.push("begin".to_string());
        Ok(Box::new(SpyTransaction {
            state: Arc::clone(&self.state),
            sql: String::new(),
            bindings: Vec::new(),
        }))
    }

    async fn fetch_all(&self, sql: &str, bindings: &Bindings) -> ModelResult<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("fetch: {}", sql));
        state.fetches.push((sql.to_string(), bindings.clone()));
        Ok(state.rows.clone())
    }

    async fn last_inserted_row(&self, table: &str, _primary_key: &str) -> ModelResult<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("last_inserted: {}", table));
        Ok(state.last_inserted.clone())
    }
}

struct SpyTransaction {
    state: Arc<Mutex<SpyState>>,
    sql: String,
    bindings: Vec<BindingEntry>,
}

#[async_trait]
impl DriverTransaction for SpyTransaction {
    fn sql(&mut self, statement: &str) {
        self.sql = statement.to_string();
        self.bindings.clear();
    }

    fn bind_value(&mut self, placeholder: &str, value: DatabaseValue, kind: ParamKind) {
        self.bindings.push(BindingEntry {
            placeholder: placeholder.to_string(),
            value,
            kind,
        });
    }

    async fn execute(&mut self) -> ModelResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.log.push(format!("execute: {}", self.sql));
        state.executed.push(Executed {
            sql: self.sql.clone(),
            bindings: self.bindings.clone(),
        });
        match &state.fail_execute {
            Some(error) => Err(error.clone()),
            None => Ok(1),
        }
    }

    async fn commit(self: Box<Self>) -> ModelResult<()> {
        let mut state = self.state.lock().unwrap();
        state.log.push("commit".to_string());
        match &state.fail_commit {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn rollback(self: Box<Self>) -> ModelResult<()> {
        self.state.lock().unwrap().log.push("rollback".to_string());
        Ok(())
    }
}
