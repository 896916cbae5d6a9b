//! Operator control plane: starts the configured task range on `start` and
//! broadcasts stop on `stop`.
//!
//! Tasks are spawned fire-and-forget. `stop` signals every task, waits the
//! grace period and returns without checking that the tasks actually
//! exited. The join handles are kept so callers can still wait on them with
//! [`ControlPlane::join_all`].
//!
//! Each stop signal is single-use and the loop ends after `stop`, so a
//! control plane cannot be restarted once stopped.

use futures::{Stream, StreamExt};
use std::collections::BTreeMap;
use std::io;
use std::str::FromStr;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::PopulateError;
use crate::runner::TaskSummary;
use crate::signal::{stop_channel, StopHandle, StopRequest, StopSignal};
use crate::task::{Task, TaskDescriptor, TaskRange};

/// Default wait after broadcasting stop.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Operator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
}

impl FromStr for Command {
    type Err = PopulateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            other => Err(PopulateError::UnrecognizedCommand(other.to_string())),
        }
    }
}

/// Parse one line read from the command source. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, PopulateError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    line.parse().map(Some)
}

/// What the control plane did when shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Tasks spawned over the control plane's lifetime.
    pub started: usize,
    /// Registry entries that accepted a stop signal.
    pub signaled: usize,
}

type TaskJoin = JoinHandle<Result<TaskSummary, PopulateError>>;

struct RegistryEntry {
    descriptor: TaskDescriptor,
    handle: StopHandle,
    /// Handed to the runner on start; `None` once started.
    signal: Option<StopSignal>,
    join: Option<TaskJoin>,
}

/// Stop channels for every task in the range, created once up front.
/// Entries are never removed.
pub struct TaskRegistry {
    entries: BTreeMap<u32, RegistryEntry>,
}

impl TaskRegistry {
    pub fn new(range: TaskRange) -> Self {
        let entries = range
            .numbers()
            .map(|n| {
                let (handle, signal) = stop_channel();
                let entry = RegistryEntry {
                    descriptor: TaskDescriptor::new(n),
                    handle,
                    signal: Some(signal),
                    join: None,
                };
                (n, entry)
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Task numbers whose runner has been spawned.
    pub fn started(&self) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, e)| e.join.is_some())
            .map(|(n, _)| *n)
            .collect()
    }

    /// Send one stop signal to every entry, returning how many accepted it.
    pub fn signal_all(&self) -> usize {
        let mut delivered = 0;
        for (n, entry) in &self.entries {
            match entry.handle.request_stop() {
                StopRequest::Delivered => delivered += 1,
                StopRequest::AlreadyPending => debug!(task = n, "Stop already pending"),
                StopRequest::Closed => debug!(task = n, "Task already exited"),
            }
        }
        delivered
    }
}

/// Reads operator commands and drives the task lifecycle.
pub struct ControlPlane<F> {
    registry: TaskRegistry,
    factory: F,
    grace_period: Duration,
}

impl<F, T> ControlPlane<F>
where
    F: FnMut(TaskDescriptor) -> T,
    T: Task,
{
    /// `factory` builds the task for each task number when `start` arrives.
    pub fn new(range: TaskRange, grace_period: Duration, factory: F) -> Self {
        Self {
            registry: TaskRegistry::new(range),
            factory,
            grace_period,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Spawn every task of the range that is not running yet.
    ///
    /// Returns the number of tasks spawned by this call.
    pub fn start(&mut self) -> usize {
        let mut spawned = 0;
        for (n, entry) in self.registry.entries.iter_mut() {
            let Some(signal) = entry.signal.take() else {
                warn!(task = n, "Task {} already started, skipping", entry.descriptor);
                continue;
            };

            let task = (self.factory)(entry.descriptor.clone());
            debug!(task = n, "Spawning task for table {}", task.descriptor().table_name());

            let descriptor = entry.descriptor.clone();
            entry.join = Some(tokio::spawn(async move {
                let result = task.run(signal).await;
                if let Err(e) = &result {
                    error!(task = descriptor.task_number(), "{e}");
                }
                result
            }));
            spawned += 1;
        }
        info!("Started {} task(s)", spawned);
        spawned
    }

    /// Signal every task, then wait the grace period.
    pub async fn stop(&mut self) -> ShutdownReport {
        info!("Stopping all tasks");
        let signaled = self.registry.signal_all();
        tokio::time::sleep(self.grace_period).await;

        let report = ShutdownReport {
            started: self.registry.started().len(),
            signaled,
        };
        info!(
            "Stop finished: {} task(s) signaled, {} started",
            report.signaled, report.started
        );
        report
    }

    /// Process commands until `stop` or until the command source ends.
    ///
    /// A closed or failing command source is treated as `stop`.
    pub async fn run<C>(&mut self, mut commands: C) -> ShutdownReport
    where
        C: Stream<Item = io::Result<String>> + Unpin,
    {
        info!("Enter a command [start, stop]");
        while let Some(line) = commands.next().await {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to read command: {e}");
                    break;
                }
            };

            match parse_line(&line) {
                Ok(Some(Command::Start)) => {
                    self.start();
                }
                Ok(Some(Command::Stop)) => return self.stop().await,
                Ok(None) => debug!("Ignoring blank command line"),
                Err(e) => warn!("{e}"),
            }
        }

        info!("Command source closed");
        self.stop().await
    }

    /// Wait for every spawned task to finish.
    ///
    /// Not part of `stop`; tasks that never observe their signal keep this
    /// pending. Panicked tasks are logged and left out.
    pub async fn join_all(&mut self) -> Vec<(u32, Result<TaskSummary, PopulateError>)> {
        let mut results = Vec::new();
        for (n, entry) in self.registry.entries.iter_mut() {
            let Some(join) = entry.join.take() else {
                continue;
            };
            match join.await {
                Ok(result) => results.push((*n, result)),
                Err(e) => error!(task = n, "Task {} panicked: {e}", entry.descriptor),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("start".parse::<Command>().unwrap(), Command::Start);
        assert_eq!(" stop\r".parse::<Command>().unwrap(), Command::Stop);
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = "pause".parse::<Command>().unwrap_err();
        assert!(matches!(err, PopulateError::UnrecognizedCommand(ref c) if c == "pause"));
        assert_eq!(
            err.to_string(),
            "Unknown command 'pause', expected one of [start, stop]"
        );
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("start\n").unwrap(), Some(Command::Start));
        assert_eq!(parse_line("").unwrap(), None);
        assert_eq!(parse_line("  \t").unwrap(), None);
        assert!(matches!(
            parse_line("pause"),
            Err(PopulateError::UnrecognizedCommand(ref c)) if c == "pause"
        ));
    }

    #[test]
    fn test_registry_covers_range() {
        let registry = TaskRegistry::new(TaskRange::new(3, 4).unwrap());
        assert_eq!(registry.len(), 4);
        assert_eq!(
            registry.entries.keys().copied().collect::<Vec<_>>(),
            vec![3, 4, 5, 6]
        );
        assert!(registry.started().is_empty());
    }

    #[test]
    fn test_signal_all_single_shot() {
        let registry = TaskRegistry::new(TaskRange::new(1, 3).unwrap());
        assert_eq!(registry.signal_all(), 3);
        // buffered signals are still pending, nothing more is queued
        assert_eq!(registry.signal_all(), 0);
    }
}
