//! Batched INSERT statement construction.
//!
//! One tick produces `record_count` records split into statements of at most
//! `sub_batch_size` rows. Values are bound positionally; the SQL text only
//! carries placeholders.

use crate::record::{SyntheticRecord, COLUMNS};

/// Default number of records inserted per tick.
pub const DEFAULT_RECORD_COUNT: u64 = 5000;

/// Default number of records per statement.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// A single multi-row INSERT with its bound records.
#[derive(Debug, Clone)]
pub struct BatchStatement {
    pub table: String,
    pub records: Vec<SyntheticRecord>,
}

impl BatchStatement {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// SQL text with one `(?, ?, ...)` group per record.
    pub fn sql(&self) -> String {
        let row_template = format!("({})", vec!["?"; COLUMNS.len()].join(", "));
        let rows_template = vec![row_template.as_str(); self.records.len()];

        format!(
            "INSERT INTO `{}` ({}) VALUES {}",
            self.table,
            COLUMNS
                .iter()
                .map(|c| format!("`{c}`"))
                .collect::<Vec<_>>()
                .join(", "),
            rows_template.join(", ")
        )
    }
}

/// Build the statements for one tick, lazily.
///
/// Every record gets the same `value_time`. Each statement is produced
/// once it holds `sub_batch_size` records, and a trailing partial statement
/// comes last, so only the statement being executed is held in memory.
/// `sub_batch_size` must be non-zero.
pub fn build_batch<'a>(
    table: &'a str,
    record_count: u64,
    sub_batch_size: usize,
    value_time: &'a str,
) -> impl Iterator<Item = BatchStatement> + 'a {
    assert!(sub_batch_size > 0, "sub_batch_size must be non-zero");

    (0..record_count).step_by(sub_batch_size).map(move |first| {
        let end = first.saturating_add(sub_batch_size as u64).min(record_count);
        BatchStatement {
            table: table.to_string(),
            records: (first..end)
                .map(|index| SyntheticRecord::new(table, index, value_time))
                .collect(),
        }
    })
}
