//! Storage capability used by the workload.

use anyhow::Result;
use async_trait::async_trait;

use crate::batch::BatchStatement;

/// Trait for the relational store receiving the load.
///
/// A single instance is shared by every task runner, so implementations
/// must accept concurrent calls without external locking.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Run a parameterized query whose first column of the first row is a count.
    async fn query_count(&self, sql: &str, params: &[&str]) -> Result<u64>;

    /// Execute a statement that returns no rows.
    async fn execute(&self, sql: &str) -> Result<()>;

    /// Execute one multi-row INSERT, returning the number of rows written.
    async fn execute_batch(&self, statement: &BatchStatement) -> Result<u64>;
}
