//! Task identity and the capability set the control plane drives.

use async_trait::async_trait;
use std::fmt;
use std::ops::Range;

use crate::error::PopulateError;
use crate::runner::TaskSummary;
use crate::signal::StopSignal;

/// Prefix of every per-task table.
pub const TABLE_PREFIX: &str = "unit_";

/// Identity of one insertion workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    task_number: u32,
    table_name: String,
}

impl TaskDescriptor {
    pub fn new(task_number: u32) -> Self {
        Self {
            task_number,
            table_name: format!("{TABLE_PREFIX}{task_number}"),
        }
    }

    pub fn task_number(&self) -> u32 {
        self.task_number
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl fmt::Display for TaskDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:02}]", self.task_number)
    }
}

/// The half-open range `[start, start + count)` of task numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRange {
    start: u32,
    count: u32,
}

impl TaskRange {
    pub fn new(start: u32, count: u32) -> Result<Self, PopulateError> {
        if start == 0 {
            return Err(PopulateError::Config(
                "task range must start at 1 or above".to_string(),
            ));
        }
        if count == 0 {
            return Err(PopulateError::Config(
                "task count must be at least 1".to_string(),
            ));
        }
        if start.checked_add(count).is_none() {
            return Err(PopulateError::Config(format!(
                "task range {start}+{count} overflows"
            )));
        }
        Ok(Self { start, count })
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn numbers(&self) -> Range<u32> {
        // checked in new()
        self.start..self.start + self.count
    }
}

/// Lifecycle of a task runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Provisioning,
    Running,
    Draining,
    Stopped,
}

/// A unit of work the control plane can spawn.
///
/// Stopping is requested through the `StopHandle` paired with the
/// `StopSignal` passed to [`Task::run`]; the control plane keeps the handle.
#[async_trait]
pub trait Task: Send + 'static {
    fn descriptor(&self) -> &TaskDescriptor;

    /// Run until stopped or failed.
    async fn run(self, stop: StopSignal) -> Result<TaskSummary, PopulateError>;
}
