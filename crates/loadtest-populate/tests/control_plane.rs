//! Control plane scenarios against the in-memory store.
//!
//! Time is paused, so tick intervals and grace periods advance instantly.

use futures::StreamExt;
use loadtest_populate::{
    ControlPlane, MemoryStore, PopulateError, ShutdownReport, TaskDescriptor, TaskRange,
    TaskRunner, TickConfig,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_stream::wrappers::UnboundedReceiverStream;

const GRACE: Duration = Duration::from_secs(2);

fn config() -> TickConfig {
    TickConfig {
        interval: Duration::from_secs(6),
        record_count: 50,
        batch_size: 20,
    }
}

type Plane = ControlPlane<Box<dyn FnMut(TaskDescriptor) -> TaskRunner<MemoryStore> + Send>>;

fn plane(store: &Arc<MemoryStore>, start: u32, count: u32) -> Plane {
    let store = store.clone();
    let factory: Box<dyn FnMut(TaskDescriptor) -> TaskRunner<MemoryStore> + Send> =
        Box::new(move |task| TaskRunner::new(task, store.clone(), "scada", config()));
    ControlPlane::new(TaskRange::new(start, count).unwrap(), GRACE, factory)
}

/// Run the control plane in the background, fed by the returned sender.
fn spawn_plane(
    mut plane: Plane,
) -> (
    mpsc::UnboundedSender<String>,
    tokio::task::JoinHandle<(Plane, ShutdownReport)>,
) {
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    let commands = UnboundedReceiverStream::new(rx).map(Ok::<_, io::Error>);
    let join = tokio::spawn(async move {
        let report = plane.run(commands).await;
        (plane, report)
    });
    (tx, join)
}

#[tokio::test(start_paused = true)]
async fn test_start_provisions_one_table_per_task() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 1, 3));

    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(store.tables(), vec!["unit_1", "unit_2", "unit_3"]);
    assert_eq!(store.batch_calls(), 0);

    // two ticks per task at 6s and 12s
    tokio::time::sleep(Duration::from_secs(12)).await;
    tx.send("stop".to_string()).unwrap();

    let (mut plane, report) = join.await.unwrap();
    assert_eq!(report, ShutdownReport { started: 3, signaled: 3 });

    let results = plane.join_all().await;
    assert_eq!(results.len(), 3);
    for (task, result) in results {
        let summary = result.unwrap();
        assert_eq!(summary.task, task);
        assert_eq!(summary.ticks, 2);
        assert_eq!(summary.rows_inserted, 100);
        assert_eq!(store.row_count(&format!("unit_{task}")), 100);
    }
}

#[tokio::test(start_paused = true)]
async fn test_range_offset() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 5, 2));

    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    tx.send("stop".to_string()).unwrap();

    let (_, report) = join.await.unwrap();
    assert_eq!(report.started, 2);
    assert_eq!(store.tables(), vec!["unit_5", "unit_6"]);
}

#[tokio::test(start_paused = true)]
async fn test_unrecognized_command_keeps_loop_running() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 1, 3));

    tx.send("pause".to_string()).unwrap();
    tx.send("".to_string()).unwrap();
    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!join.is_finished());

    tx.send("stop".to_string()).unwrap();
    let (_, report) = join.await.unwrap();
    assert_eq!(report.started, 3);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_does_not_duplicate_tasks() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 1, 2));

    tx.send("start".to_string()).unwrap();
    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(7)).await;
    tx.send("stop".to_string()).unwrap();

    let (mut plane, report) = join.await.unwrap();
    assert_eq!(report, ShutdownReport { started: 2, signaled: 2 });
    for (_, result) in plane.join_all().await {
        assert_eq!(result.unwrap().ticks, 1);
    }
    assert_eq!(store.create_count("unit_1"), 1);
    assert_eq!(store.row_count("unit_1"), 50);
}

#[tokio::test(start_paused = true)]
async fn test_stop_returns_after_grace_without_waiting_for_tasks() {
    // one tick takes 3 statements x 10s = 30s
    let store = Arc::new(MemoryStore::new().with_batch_delay(Duration::from_secs(10)));
    let (tx, join) = spawn_plane(plane(&store, 1, 3));

    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(7)).await;

    let stop_sent = Instant::now();
    tx.send("stop".to_string()).unwrap();
    let (mut plane, report) = join.await.unwrap();

    let waited = stop_sent.elapsed();
    assert!(waited >= GRACE && waited < Duration::from_secs(3));
    assert_eq!(report.signaled, 3);

    // the tasks finish their in-flight tick, then observe the signal
    let results = plane.join_all().await;
    assert_eq!(results.len(), 3);
    for (_, result) in results {
        let summary = result.unwrap();
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.rows_inserted, 50);
    }
}

#[tokio::test(start_paused = true)]
async fn test_closed_command_source_stops_tasks() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 1, 2));

    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(tx);

    let (mut plane, report) = join.await.unwrap();
    assert_eq!(report, ShutdownReport { started: 2, signaled: 2 });
    assert!(plane.join_all().await.iter().all(|(_, r)| r.is_ok()));
}

#[tokio::test(start_paused = true)]
async fn test_stop_before_start() {
    let store = Arc::new(MemoryStore::new());
    let (tx, join) = spawn_plane(plane(&store, 1, 3));

    tx.send("stop".to_string()).unwrap();
    let (_, report) = join.await.unwrap();

    assert_eq!(report, ShutdownReport { started: 0, signaled: 3 });
    assert!(store.tables().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_task_failure_is_isolated() {
    // the first statement executed anywhere fails; exactly one task dies
    let store = Arc::new(MemoryStore::new().fail_batch_call(1));
    let (tx, join) = spawn_plane(plane(&store, 1, 3));

    tx.send("start".to_string()).unwrap();
    tokio::time::sleep(Duration::from_secs(13)).await;
    tx.send("stop".to_string()).unwrap();

    let (mut plane, report) = join.await.unwrap();
    assert_eq!(report.started, 3);
    // the failed task dropped its receiver
    assert_eq!(report.signaled, 2);

    let results = plane.join_all().await;
    let failed: Vec<_> = results.iter().filter(|(_, r)| r.is_err()).collect();
    assert_eq!(failed.len(), 1);
    assert!(matches!(
        failed[0].1,
        Err(PopulateError::StorageExecution { inserted: 0, .. })
    ));

    let healthy: Vec<_> = results.iter().filter_map(|(_, r)| r.as_ref().ok()).collect();
    assert_eq!(healthy.len(), 2);
    assert!(healthy.iter().all(|s| s.ticks == 2));
}
