//! Ticker-driven insertion loop for one task.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::batch::{build_batch, DEFAULT_BATCH_SIZE, DEFAULT_RECORD_COUNT};
use crate::error::PopulateError;
use crate::provision::ensure_table;
use crate::record::format_value_time;
use crate::signal::StopSignal;
use crate::store::Store;
use crate::task::{Task, TaskDescriptor, TaskState};

/// Default time between two ticks of one task.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(6);

/// Shape of the work done on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickConfig {
    pub interval: Duration,
    pub record_count: u64,
    pub batch_size: usize,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            record_count: DEFAULT_RECORD_COUNT,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Totals reported by a runner when it stops cleanly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSummary {
    pub task: u32,
    pub ticks: u64,
    pub rows_inserted: u64,
    /// Time spent inside ticks, excluding the idle wait between them.
    pub busy: Duration,
}

impl TaskSummary {
    fn new(task: u32) -> Self {
        Self {
            task,
            ..Default::default()
        }
    }

    /// Calculate rows per second over the time spent inserting.
    pub fn rows_per_second(&self) -> f64 {
        if self.busy.as_secs_f64() > 0.0 {
            self.rows_inserted as f64 / self.busy.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Wall-clock time of each tick, advanced by the monotonic clock.
///
/// Consecutive ticks of a task are therefore at least one interval apart in
/// `value_time` even if the system clock steps backwards.
struct TickClock {
    wall: DateTime<Local>,
    origin: Instant,
}

impl TickClock {
    fn start() -> Self {
        Self {
            wall: Local::now(),
            origin: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Local> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.wall + elapsed
    }
}

/// Drives one task: provision its table, then insert on every tick until
/// stopped or until a statement fails.
pub struct TaskRunner<S: Store> {
    descriptor: TaskDescriptor,
    store: Arc<S>,
    database: String,
    config: TickConfig,
    state: TaskState,
}

impl<S: Store> TaskRunner<S> {
    pub fn new(
        descriptor: TaskDescriptor,
        store: Arc<S>,
        database: impl Into<String>,
        config: TickConfig,
    ) -> Self {
        Self {
            descriptor,
            store,
            database: database.into(),
            config,
            state: TaskState::Provisioning,
        }
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    fn transition(&mut self, next: TaskState) {
        debug!(
            task = self.descriptor.task_number(),
            "Task {}: {:?} -> {:?}", self.descriptor, self.state, next
        );
        self.state = next;
    }

    /// Insert one tick worth of records.
    ///
    /// Returns the rows written; on failure the error carries the rows that
    /// made it in before the failing statement.
    async fn tick(&self, value_time: &str) -> Result<u64, PopulateError> {
        let statements = build_batch(
            self.descriptor.table_name(),
            self.config.record_count,
            self.config.batch_size,
            value_time,
        );

        let mut inserted = 0u64;
        for statement in statements {
            match self.store.execute_batch(&statement).await {
                Ok(rows) => inserted += rows,
                Err(cause) => {
                    return Err(PopulateError::StorageExecution {
                        task: self.descriptor.task_number(),
                        inserted,
                        cause,
                    })
                }
            }
        }
        Ok(inserted)
    }

    async fn run_loop(&mut self, stop: &mut StopSignal) -> Result<TaskSummary, PopulateError> {
        let task = self.descriptor.task_number();

        // First firing one interval from now; a slow tick pushes the next one back.
        let first_tick = Instant::now()
            .checked_add(self.config.interval)
            .ok_or_else(|| {
                PopulateError::Config(format!(
                    "interval {:?} is out of range",
                    self.config.interval
                ))
            })?;

        let table = self.descriptor.table_name();
        if let Err(cause) = ensure_table(self.store.as_ref(), &self.database, table).await {
            return Err(PopulateError::Provisioning {
                task,
                table: table.to_string(),
                cause,
            });
        }

        self.transition(TaskState::Running);
        info!(
            task,
            "Task {}: started, inserting {} rows into {} every {:?}",
            self.descriptor,
            self.config.record_count,
            self.descriptor.table_name(),
            self.config.interval
        );

        let mut ticker = interval_at(first_tick, self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let clock = TickClock::start();
        let mut summary = TaskSummary::new(task);
        loop {
            // biased: a pending stop wins over a timer firing at the same time
            tokio::select! {
                biased;
                _ = stop.recv() => {
                    self.transition(TaskState::Draining);
                    break;
                }
                _ = ticker.tick() => {
                    let tick_time = format_value_time(&clock.now());
                    let begin = Instant::now();

                    let rows = self.tick(&tick_time).await?;

                    let elapsed = begin.elapsed();
                    summary.ticks += 1;
                    summary.rows_inserted += rows;
                    summary.busy += elapsed;

                    let rows_per_second = if elapsed.as_secs_f64() > 0.0 {
                        rows as f64 / elapsed.as_secs_f64()
                    } else {
                        0.0
                    };
                    info!(
                        task,
                        rows,
                        "Task {}[{}]: inserted {} rows in {:6.3}s ({:.0} rows/sec)",
                        self.descriptor,
                        tick_time,
                        rows,
                        elapsed.as_secs_f64(),
                        rows_per_second
                    );
                }
            }
        }

        Ok(summary)
    }
}

#[async_trait]
impl<S: Store> Task for TaskRunner<S> {
    fn descriptor(&self) -> &TaskDescriptor {
        &self.descriptor
    }

    async fn run(mut self, mut stop: StopSignal) -> Result<TaskSummary, PopulateError> {
        let result = self.run_loop(&mut stop).await;
        self.transition(TaskState::Stopped);

        if let Ok(summary) = &result {
            info!(
                task = summary.task,
                "Task {}: exited after {} ticks, {} rows ({:.0} rows/sec)",
                self.descriptor,
                summary.ticks,
                summary.rows_inserted,
                summary.rows_per_second()
            );
        }
        result
    }
}
