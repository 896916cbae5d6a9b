//! Per-task table provisioning.

use anyhow::Result;
use tracing::{debug, info};

use crate::store::Store;

/// Database the existence check is scoped to unless configured otherwise.
pub const DEFAULT_DATABASE: &str = "scada";

const TABLE_EXISTS_QUERY: &str = "SELECT COUNT(*) FROM information_schema.tables \
     WHERE table_schema = ? AND table_name = ?";

/// Outcome of [`ensure_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Existing,
}

/// Generate the CREATE TABLE statement for a task table.
///
/// `value_time2` duplicates `value_time`; existing readers expect it.
pub fn generate_create_table(table_name: &str) -> String {
    format!(
        "CREATE TABLE `{table_name}` (\
         `node_id` VARBINARY(128), \
         `value_time` BINARY(24), \
         `sub_index` SMALLINT UNSIGNED, \
         `value_time2` BINARY(24), \
         `node_value` VARBINARY(64), \
         `value_quality` SMALLINT UNSIGNED, \
         `value_type` SMALLINT UNSIGNED, \
         PRIMARY KEY (`node_id`, `sub_index`, `value_time`))"
    )
}

/// Check whether `table_name` exists in `database`.
pub async fn table_exists<S: Store + ?Sized>(
    store: &S,
    database: &str,
    table_name: &str,
) -> Result<bool> {
    let count = store
        .query_count(TABLE_EXISTS_QUERY, &[database, table_name])
        .await?;
    Ok(count > 0)
}

/// Create the task table unless it already exists.
pub async fn ensure_table<S: Store + ?Sized>(
    store: &S,
    database: &str,
    table_name: &str,
) -> Result<Provisioned> {
    if table_exists(store, database, table_name).await? {
        debug!(table = table_name, "Table already exists");
        return Ok(Provisioned::Existing);
    }

    store.execute(&generate_create_table(table_name)).await?;
    info!(table = table_name, database, "Created table");
    Ok(Provisioned::Created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_generate_create_table() {
        let sql = generate_create_table("unit_1");
        assert!(sql.starts_with("CREATE TABLE `unit_1` ("));
        assert!(sql.contains("`node_id` VARBINARY(128)"));
        assert!(sql.contains("`value_time2` BINARY(24)"));
        assert!(sql.contains("PRIMARY KEY (`node_id`, `sub_index`, `value_time`)"));
    }

    #[tokio::test]
    async fn test_ensure_table_is_idempotent() {
        let store = MemoryStore::new();

        let first = ensure_table(&store, DEFAULT_DATABASE, "unit_1").await.unwrap();
        let second = ensure_table(&store, DEFAULT_DATABASE, "unit_1").await.unwrap();

        assert_eq!(first, Provisioned::Created);
        assert_eq!(second, Provisioned::Existing);
        assert_eq!(store.create_count("unit_1"), 1);
    }

    #[tokio::test]
    async fn test_existence_scoped_to_database() {
        let store = MemoryStore::with_database("other");
        ensure_table(&store, "other", "unit_1").await.unwrap();

        assert!(!table_exists(&store, DEFAULT_DATABASE, "unit_1").await.unwrap());
        assert!(table_exists(&store, "other", "unit_1").await.unwrap());
    }

    #[tokio::test]
    async fn test_query_failure_surfaces() {
        let store = MemoryStore::new().fail_queries();
        let err = ensure_table(&store, DEFAULT_DATABASE, "unit_1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("query"));
        assert_eq!(store.create_count("unit_1"), 0);
    }
}
