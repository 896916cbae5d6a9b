//! In-memory store.
//!
//! Backs `--dry-run` and the tests. It tracks tables per database, enforces
//! the `(node_id, sub_index, value_time)` primary key and can be told to
//! fail or slow down specific calls.
//!
//! Only the keys of the most recent `value_time` of each table are kept.
//! Tick timestamps never go backwards, so a duplicate key can only come
//! from a tick landing on the same millisecond as the previous one.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use crate::batch::BatchStatement;
use crate::provision::DEFAULT_DATABASE;
use crate::store::Store;

#[derive(Default)]
struct TableRows {
    rows: u64,
    latest_value_time: String,
    /// `(node_id, sub_index)` pairs written at `latest_value_time`.
    latest_keys: HashSet<(String, u16)>,
}

#[derive(Default)]
struct State {
    tables: HashSet<(String, String)>,
    creates: HashMap<String, usize>,
    rows: HashMap<String, TableRows>,
    batch_calls: usize,
}

/// A [`Store`] keeping everything in process memory.
pub struct MemoryStore {
    database: String,
    state: Mutex<State>,
    fail_queries: bool,
    fail_batch_call: Option<usize>,
    batch_delay: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_database(DEFAULT_DATABASE)
    }

    /// Store whose CREATE TABLE statements land in `database`.
    pub fn with_database(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Mutex::new(State::default()),
            fail_queries: false,
            fail_batch_call: None,
            batch_delay: None,
        }
    }

    /// Make every `query_count` call fail.
    pub fn fail_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    /// Make the n-th `execute_batch` call (1-based, across all tables) fail.
    pub fn fail_batch_call(mut self, call: usize) -> Self {
        self.fail_batch_call = Some(call);
        self
    }

    /// Sleep this long inside every `execute_batch` call.
    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    /// How many times `table` was created.
    pub fn create_count(&self, table: &str) -> usize {
        self.lock().creates.get(table).copied().unwrap_or(0)
    }

    /// Rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> u64 {
        self.lock().rows.get(table).map_or(0, |t| t.rows)
    }

    /// Number of `execute_batch` calls seen so far, failed ones included.
    pub fn batch_calls(&self) -> usize {
        self.lock().batch_calls
    }

    /// Tables created in this store's database, sorted.
    pub fn tables(&self) -> Vec<String> {
        let state = self.lock();
        let mut tables: Vec<_> = state
            .tables
            .iter()
            .filter(|(db, _)| *db == self.database)
            .map(|(_, table)| table.clone())
            .collect();
        tables.sort();
        tables
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // a panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn quoted_table_name(sql: &str) -> Option<&str> {
    let rest = sql.strip_prefix("CREATE TABLE `")?;
    rest.split('`').next()
}

#[async_trait]
impl Store for MemoryStore {
    async fn query_count(&self, _sql: &str, params: &[&str]) -> Result<u64> {
        if self.fail_queries {
            bail!("query failed: connection refused");
        }
        let [database, table] = params else {
            bail!("expected 2 parameters, got {}", params.len());
        };
        let exists = self
            .lock()
            .tables
            .contains(&(database.to_string(), table.to_string()));
        Ok(u64::from(exists))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let table =
            quoted_table_name(sql).ok_or_else(|| anyhow!("unsupported statement: {sql}"))?;
        let mut state = self.lock();
        if !state.tables.insert((self.database.clone(), table.to_string())) {
            bail!("Table '{table}' already exists");
        }
        *state.creates.entry(table.to_string()).or_default() += 1;
        Ok(())
    }

    async fn execute_batch(&self, statement: &BatchStatement) -> Result<u64> {
        let call = {
            let mut state = self.lock();
            state.batch_calls += 1;
            state.batch_calls
        };

        if let Some(delay) = self.batch_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_batch_call == Some(call) {
            bail!("Lock wait timeout exceeded");
        }

        let mut state = self.lock();
        if !state
            .tables
            .contains(&(self.database.clone(), statement.table.clone()))
        {
            bail!("Table '{}' doesn't exist", statement.table);
        }

        let rows = state.rows.entry(statement.table.clone()).or_default();
        // statements are atomic: reject the whole batch on any duplicate
        let mut batch_keys = HashSet::new();
        for record in &statement.records {
            let key = (record.node_id.clone(), record.sub_index);
            let seen = record.value_time == rows.latest_value_time
                && rows.latest_keys.contains(&key);
            if seen || !batch_keys.insert((key, record.value_time.as_str())) {
                bail!(
                    "Duplicate entry '{}-{}-{}' for key 'PRIMARY'",
                    record.node_id,
                    record.sub_index,
                    record.value_time
                );
            }
        }

        for (key, value_time) in batch_keys {
            if value_time > rows.latest_value_time.as_str() {
                rows.latest_value_time = value_time.to_string();
                rows.latest_keys.clear();
            }
            if value_time == rows.latest_value_time {
                rows.latest_keys.insert(key);
            }
        }
        rows.rows += statement.len() as u64;

        Ok(statement.len() as u64)
    }
}
