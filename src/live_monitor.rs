//! Live monitoring for kapstat
//!
//! Watches the sample paths for changes and re-renders the capacity report
//! at a fixed interval. Each refresh is a full replay from the files:
//! trackers are rebuilt rather than shared across tasks, which keeps the
//! core free of synchronization exactly as it is in one-shot report mode.

use crate::{
    aggregation::Aggregator,
    data_loader::DataLoader,
    error::{KapstatError, Result},
    filters::SampleFilter,
    output::get_formatter,
};
use chrono::Local;
use colored::Colorize;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};

const WATCHER_POLL_INTERVAL: Duration = Duration::from_millis(100);
const WATCHER_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(200);

/// Live monitoring state
pub struct LiveMonitor {
    data_loader: Arc<DataLoader>,
    aggregator: Arc<Aggregator>,
    filter: SampleFilter,
    json_output: bool,
    interval_secs: u64,
}

impl LiveMonitor {
    /// Create a new live monitor
    pub fn new(
        data_loader: Arc<DataLoader>,
        aggregator: Arc<Aggregator>,
        filter: SampleFilter,
        json_output: bool,
        interval_secs: u64,
    ) -> Self {
        Self {
            data_loader,
            aggregator,
            filter,
            json_output,
            interval_secs,
        }
    }

    /// Start the monitoring loop; returns on Ctrl+C
    pub async fn run(self) -> Result<()> {
        let should_refresh = Arc::new(AtomicBool::new(true));
        let should_refresh_watcher = should_refresh.clone();

        let should_stop = Arc::new(AtomicBool::new(false));
        let should_stop_watcher = should_stop.clone();

        let (tx, mut rx) = mpsc::channel(10);
        let watched_paths = self.data_loader.paths().to_vec();

        // The notify watcher lives on a blocking thread; it flags refreshes
        // through the channel and is told to stop through the atomic.
        let mut watcher_handle = tokio::task::spawn_blocking(move || -> Result<()> {
            let mut watcher = RecommendedWatcher::new(
                move |result: notify::Result<Event>| {
                    if let Ok(event) = result
                        && matches!(
                            event.kind,
                            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                        )
                    {
                        for path in &event.paths {
                            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
                                should_refresh_watcher.store(true, Ordering::Release);
                                let _ = tx.blocking_send(());
                                break;
                            }
                        }
                    }
                },
                Config::default(),
            )
            .map_err(|e| {
                KapstatError::Io(std::io::Error::other(format!(
                    "Failed to create file watcher: {e}"
                )))
            })?;

            for path in watched_paths {
                if path.exists() {
                    watcher.watch(&path, RecursiveMode::Recursive).map_err(|e| {
                        KapstatError::Io(std::io::Error::other(format!(
                            "Failed to watch {}: {e}",
                            path.display()
                        )))
                    })?;
                }
            }

            while !should_stop_watcher.load(Ordering::Acquire) {
                std::thread::sleep(WATCHER_POLL_INTERVAL);
            }

            drop(watcher);
            Ok(())
        });

        let mut interval = interval(Duration::from_secs(self.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        self.refresh_display().await?;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if should_refresh.load(Ordering::Acquire) {
                        self.refresh_display().await?;
                        should_refresh.store(false, Ordering::Release);
                    }
                }
                _ = rx.recv() => {
                    // Let in-flight writes land before re-reading
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    self.refresh_display().await?;
                    should_refresh.store(false, Ordering::Release);
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\nExiting watch mode...");
                    break;
                }
            }
        }

        should_stop.store(true, Ordering::Release);

        tokio::select! {
            res = &mut watcher_handle => {
                match res {
                    Ok(Ok(())) => tracing::debug!("Watcher task exited gracefully"),
                    Ok(Err(e)) => tracing::warn!("Watcher task exited with an error: {}", e),
                    Err(e) if e.is_panic() => tracing::warn!("Watcher task panicked: {:?}", e),
                    Err(e) => tracing::warn!("Watcher task was cancelled: {}", e),
                }
            }
            _ = tokio::time::sleep(WATCHER_SHUTDOWN_TIMEOUT) => {
                watcher_handle.abort();
                if let Err(e) = watcher_handle.await
                    && e.is_panic()
                {
                    tracing::warn!("Watcher task panicked during forced shutdown: {:?}", e);
                }
                tracing::warn!("Watcher task did not shut down in time and was aborted");
            }
        }

        Ok(())
    }

    /// Re-replay the sample files and redraw the report
    async fn refresh_display(&self) -> Result<()> {
        let report = self
            .aggregator
            .aggregate(self.data_loader.load_samples(), &self.filter)
            .await?;

        if self.json_output {
            println!("{}", get_formatter(true).format_report(&report));
            return Ok(());
        }

        // Clear screen and move cursor to top-left
        print!("\x1B[2J\x1B[1;1H");
        let now = Local::now();
        println!(
            "{} - last updated {}",
            "kapstat watch".bold(),
            now.format("%Y-%m-%d %H:%M:%S")
        );
        println!(
            "Refresh interval: {}s | Press Ctrl+C to exit",
            self.interval_secs
        );
        println!("{}", "-".repeat(72));
        println!("{}", get_formatter(false).format_report(&report));
        Ok(())
    }
}
