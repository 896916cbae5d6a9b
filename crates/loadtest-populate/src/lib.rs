//! Multi-task insert workload for stress-testing ingestion.
//!
//! Each task owns one table (`unit_<n>`) and inserts a fixed number of
//! synthetic time-series records on every tick, split into bounded
//! multi-row INSERT statements. A [`ControlPlane`] starts and stops the
//! tasks on operator commands.
//!
//! # Example
//!
//! ```ignore
//! use loadtest_populate::{ControlPlane, TaskDescriptor, TaskRange, TaskRunner, TickConfig};
//!
//! let store = Arc::new(store);
//! let mut control = ControlPlane::new(TaskRange::new(1, 3)?, grace, |task: TaskDescriptor| {
//!     TaskRunner::new(task, store.clone(), "scada", TickConfig::default())
//! });
//! let report = control.run(commands).await;
//! ```

pub mod args;
pub mod batch;
pub mod control;
pub mod duration;
pub mod error;
pub mod memory;
pub mod provision;
pub mod record;
pub mod runner;
pub mod signal;
pub mod store;
pub mod task;

pub use args::{CommonPopulateArgs, OperationType};
pub use batch::{build_batch, BatchStatement};
pub use control::{parse_line, Command, ControlPlane, ShutdownReport, TaskRegistry};
pub use error::PopulateError;
pub use memory::MemoryStore;
pub use provision::{ensure_table, Provisioned};
pub use record::SyntheticRecord;
pub use runner::{TaskRunner, TaskSummary, TickConfig};
pub use signal::{stop_channel, StopHandle, StopSignal};
pub use store::Store;
pub use task::{Task, TaskDescriptor, TaskRange, TaskState};
