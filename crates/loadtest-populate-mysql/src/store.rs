//! `Store` implementation over a mysql_async pool.

use anyhow::Result;
use async_trait::async_trait;
use loadtest_populate::{BatchStatement, Store, SyntheticRecord};
use mysql_async::{prelude::*, Params, Pool, Value};
use tracing::debug;

use crate::error::MySQLPopulatorError;

/// MySQL store shared by every task runner.
///
/// The pool hands each call its own connection, so concurrent runners never
/// share a session.
pub struct MySQLStore {
    pool: Pool,
}

impl MySQLStore {
    /// Create the pool and check that the server is reachable.
    pub async fn connect(connection_string: &str) -> Result<Self, MySQLPopulatorError> {
        let pool = Pool::from_url(connection_string)?;
        let conn = pool.get_conn().await?;
        debug!("Connected to MySQL server {:?}", conn.server_version());
        drop(conn);
        Ok(Self { pool })
    }

    /// Close every pooled connection.
    pub async fn disconnect(self) -> Result<(), MySQLPopulatorError> {
        self.pool.disconnect().await?;
        Ok(())
    }
}

/// Positional parameters for one record, in `COLUMNS` order.
pub fn record_params(record: &SyntheticRecord) -> [Value; 7] {
    [
        Value::from(record.node_id.as_str()),
        Value::from(record.value_time.as_str()),
        Value::from(record.sub_index),
        Value::from(record.value_time.as_str()),
        Value::from(record.node_value),
        Value::from(record.value_quality),
        Value::from(record.value_type),
    ]
}

fn statement_params(statement: &BatchStatement) -> Params {
    let params: Vec<Value> = statement.records.iter().flat_map(record_params).collect();
    Params::Positional(params)
}

#[async_trait]
impl Store for MySQLStore {
    async fn query_count(&self, sql: &str, params: &[&str]) -> Result<u64> {
        let mut conn = self.pool.get_conn().await?;
        let params: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
        let count: Option<u64> = conn.exec_first(sql, Params::Positional(params)).await?;
        Ok(count.unwrap_or(0))
    }

    async fn execute(&self, sql: &str) -> Result<()> {
        let mut conn = self.pool.get_conn().await?;
        conn.query_drop(sql).await?;
        Ok(())
    }

    async fn execute_batch(&self, statement: &BatchStatement) -> Result<u64> {
        if statement.is_empty() {
            return Ok(0);
        }

        let mut conn = self.pool.get_conn().await?;
        conn.exec_drop(statement.sql(), statement_params(statement))
            .await?;
        Ok(statement.len() as u64)
    }
}
