//! Populate command runner.

use anyhow::Context;
use futures::Stream;
use loadtest_populate::{
    ControlPlane, MemoryStore, ShutdownReport, Store, TaskRange, TaskRunner, TickConfig,
};
use loadtest_populate_mysql::{MySQLPopulateArgs, MySQLStore};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;

/// Run the insert workload under interactive start/stop control.
///
/// All parameters are validated before connecting, so a bad flag never
/// touches the database.
pub async fn run_populate(args: MySQLPopulateArgs) -> anyhow::Result<()> {
    let range = args.common.task_range()?;
    let tick = args.common.tick_config()?;
    let database = args.database()?;
    let grace_period = args.common.grace_period()?;

    tracing::info!(
        "{:?} tasks {}..{} ({} total): {} rows every {:?} in statements of at most {} rows",
        args.common.operation,
        range.start(),
        range.start() + range.count() - 1,
        range.count(),
        tick.record_count,
        tick.interval,
        tick.batch_size
    );

    if args.common.dry_run {
        tracing::info!("[DRY-RUN] Using an in-memory store instead of {}", args.masked_url());
        let store = Arc::new(MemoryStore::with_database(database.clone()));
        let report = run_insert(
            store.clone(),
            database,
            range,
            tick,
            grace_period,
            stdin_commands(),
        )
        .await;
        for table in store.tables() {
            tracing::info!("[DRY-RUN] {}: {} rows", table, store.row_count(&table));
        }
        tracing::info!("[DRY-RUN] {} task(s) started", report.started);
        return Ok(());
    }

    tracing::info!("Connecting to MySQL at {}", args.masked_url());
    let store = Arc::new(
        MySQLStore::connect(&args.connection_url())
            .await
            .context("Failed to connect to MySQL")?,
    );

    run_insert(
        store.clone(),
        database,
        range,
        tick,
        grace_period,
        stdin_commands(),
    )
    .await;

    // Tasks still inside a tick after the grace period keep their handle;
    // their connections close when the process exits.
    match Arc::try_unwrap(store) {
        Ok(store) => store
            .disconnect()
            .await
            .context("Failed to disconnect from MySQL")?,
        Err(_) => tracing::warn!("Some tasks were still running after the grace period"),
    }
    Ok(())
}

/// Drive the control plane over `commands` until stop.
pub async fn run_insert<S, C>(
    store: Arc<S>,
    database: String,
    range: TaskRange,
    tick: TickConfig,
    grace_period: Duration,
    commands: C,
) -> ShutdownReport
where
    S: Store,
    C: Stream<Item = io::Result<String>> + Unpin,
{
    let mut control = ControlPlane::new(range, grace_period, move |task| {
        TaskRunner::new(task, store.clone(), database.clone(), tick)
    });
    control.run(commands).await
}

fn stdin_commands() -> LinesStream<BufReader<tokio::io::Stdin>> {
    LinesStream::new(BufReader::new(tokio::io::stdin()).lines())
}
