use chrono::Utc;
use engine_config::{Schedule, ScheduleDocument, TableMapping};
use engine_pipeline::RunReport;
use futures::future::join_all;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::engine::Engine;
use crate::lock::{FileLock, LockError};

/// Result of one scheduler-driven attempt to run a schedule's tables (§4.8).
/// `Skipped` is the coalescing outcome: a cron tick (or a manual trigger)
/// that finds the lock already held never queues behind the running
/// instance, it is simply dropped.
pub enum RunOutcome {
    Completed(RunReport),
    Skipped,
    LockError(String),
}

/// The Run Scheduler (C8, §4.8): one cron-tick loop per configured
/// `Schedule` entry, each independently enforcing single-writer execution
/// through the shared PID-file lock. State machine per tick:
/// `idle -> acquiring -> running -> releasing -> idle`.
pub struct Scheduler<'a> {
    engine: &'a Engine,
    mappings: &'a [TableMapping],
    lock: FileLock,
}

impl<'a> Scheduler<'a> {
    pub fn new(engine: &'a Engine, mappings: &'a [TableMapping], lock_file_path: &str) -> Self {
        Scheduler {
            engine,
            mappings,
            lock: FileLock::new(lock_file_path),
        }
    }

    /// Runs every enabled schedule's tick loop concurrently until
    /// `shutdown` is cancelled (`daemon`'s foreground loop, §6).
    pub async fn run_daemon(&self, document: &ScheduleDocument, shutdown: CancellationToken) {
        let loops = document
            .schedules
            .iter()
            .filter(|s| s.enabled)
            .map(|schedule| self.tick_loop(schedule, &shutdown));
        join_all(loops).await;
    }

    async fn tick_loop(&self, schedule: &Schedule, shutdown: &CancellationToken) {
        let cron_schedule = match cron::Schedule::from_str(&schedule.cron_expression) {
            Ok(s) => s,
            Err(e) => {
                error!(schedule = %schedule.id, error = %e, "invalid cron expression at runtime");
                return;
            }
        };

        loop {
            let now = Utc::now();
            let Some(next) = cron_schedule.after(&now).next() else {
                warn!(schedule = %schedule.id, "cron expression has no future occurrences");
                return;
            };
            let sleep_for = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);

            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(sleep_for) => {}
            }

            if shutdown.is_cancelled() {
                return;
            }

            self.execute(schedule).await;
        }
    }

    /// Runs one schedule now, whether from a cron tick or a manual trigger
    /// (`sync`). Coalesces per §4.8: a tick that cannot acquire the lock is
    /// dropped, never queued.
    pub async fn execute(&self, schedule: &Schedule) -> RunOutcome {
        let guard = match self.lock.try_acquire() {
            Ok(guard) => guard,
            Err(LockError::AlreadyHeld(pid)) => {
                warn!(schedule = %schedule.id, holder_pid = pid, "sync already running, coalescing tick");
                return RunOutcome::Skipped;
            }
            Err(e) => {
                error!(schedule = %schedule.id, error = %e, "failed to acquire run lock");
                return RunOutcome::LockError(e.to_string());
            }
        };

        let mappings: Vec<TableMapping> = self
            .mappings
            .iter()
            .filter(|m| schedule.tables.iter().any(|t| t == &m.source_table))
            .cloned()
            .collect();

        let run_id = Uuid::new_v4().to_string();
        info!(schedule = %schedule.id, run_id = %run_id, tables = mappings.len(), "starting scheduled sync");
        let cancel = CancellationToken::new();
        let report = self
            .engine
            .sync(&mappings, &run_id, schedule.full_sync, &cancel)
            .await;

        drop(guard);
        RunOutcome::Completed(report)
    }
}
