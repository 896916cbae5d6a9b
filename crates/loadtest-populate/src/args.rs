//! Common CLI argument definitions shared by all populators.

use clap::{Args, ValueEnum};
use std::time::Duration;

use crate::duration::parse_duration;
use crate::error::PopulateError;
use crate::runner::TickConfig;
use crate::task::TaskRange;

/// Upper bound for `--interval` and `--grace-period`.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 3600);

/// Workload selector. Only inserts are generated today.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperationType {
    /// Periodic batched inserts into one table per task
    #[default]
    Insert,
}

/// Common arguments shared by all populators.
///
/// Every flag can also be supplied through the environment so the tool can
/// run unattended inside a container.
#[derive(Args, Clone, Debug)]
pub struct CommonPopulateArgs {
    /// Workload type
    #[arg(long = "type", value_enum, default_value_t = OperationType::Insert, env = "UNIT_INGEST_TYPE")]
    pub operation: OperationType,

    /// First task number (tables are named unit_<n>)
    #[arg(long, default_value = "1", env = "UNIT_INGEST_START", value_parser = clap::value_parser!(u32).range(1..))]
    pub start: u32,

    /// Number of concurrent tasks
    #[arg(long, default_value = "1", env = "UNIT_INGEST_COUNT", value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Records inserted by each task on every tick
    #[arg(long, default_value = "5000", env = "UNIT_INGEST_RECORD_COUNT")]
    pub record_count: u64,

    /// Maximum records per INSERT statement
    #[arg(long, default_value = "500", env = "UNIT_INGEST_BATCH_SIZE")]
    pub batch_size: usize,

    /// Tick interval (e.g. "6s", "500ms", "1m")
    #[arg(long, default_value = "6s", env = "UNIT_INGEST_INTERVAL", value_parser = parse_duration)]
    pub interval: Duration,

    /// Wait after broadcasting stop before returning
    #[arg(long, default_value = "2s", env = "UNIT_INGEST_GRACE_PERIOD", value_parser = parse_duration)]
    pub grace_period: Duration,

    /// Dry-run mode: run the workload against an in-memory store instead of the database
    #[arg(long)]
    pub dry_run: bool,
}

impl CommonPopulateArgs {
    /// Task numbers covered by `--start` and `--count`.
    pub fn task_range(&self) -> Result<TaskRange, PopulateError> {
        TaskRange::new(self.start, self.count)
    }

    /// Per-tick workload shape, validated.
    pub fn tick_config(&self) -> Result<TickConfig, PopulateError> {
        if self.batch_size == 0 {
            return Err(PopulateError::Config(
                "--batch-size must be at least 1".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(PopulateError::Config(
                "--interval must be greater than zero".to_string(),
            ));
        }
        if self.interval > MAX_DURATION {
            return Err(PopulateError::Config(format!(
                "--interval must be at most {MAX_DURATION:?}"
            )));
        }
        Ok(TickConfig {
            interval: self.interval,
            record_count: self.record_count,
            batch_size: self.batch_size,
        })
    }

    /// Wait after stop, validated.
    pub fn grace_period(&self) -> Result<Duration, PopulateError> {
        if self.grace_period > MAX_DURATION {
            return Err(PopulateError::Config(format!(
                "--grace-period must be at most {MAX_DURATION:?}"
            )));
        }
        Ok(self.grace_period)
    }
}
