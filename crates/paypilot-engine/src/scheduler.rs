//! Cron-driven reminder scheduler.
//!
//! Each job runs on its own task, sleeping until the next cron occurrence
//! (local time). A job never overlaps itself: a trigger that arrives while
//! the previous run of the same job is still in flight is skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, Utc};
use croner::Cron;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::SchedulerError;
use crate::reminders::{JobKind, JobReport, ReminderJobs};

/// Non-overlap flag for one job.
#[derive(Debug, Default)]
pub struct JobGate {
    running: AtomicBool,
}

impl JobGate {
    pub fn try_enter(&self) -> Option<GateGuard<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { gate: self })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Clears the gate on drop.
pub struct GateGuard<'a> {
    gate: &'a JobGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.running.store(false, Ordering::Release);
    }
}

struct ScheduledJob {
    kind: JobKind,
    cron: Cron,
    gate: JobGate,
}

fn parse_cron(kind: JobKind, expr: &str) -> Result<Cron, SchedulerError> {
    Cron::new(expr).parse().map_err(|e| SchedulerError::InvalidCron {
        job: kind,
        reason: e.to_string(),
    })
}

pub struct ReminderScheduler {
    jobs: ReminderJobs,
    overdue: ScheduledJob,
    upcoming: ScheduledJob,
    cancel: CancellationToken,
}

impl ReminderScheduler {
    pub fn new(
        jobs: ReminderJobs,
        overdue_cron: &str,
        upcoming_cron: &str,
    ) -> Result<Self, SchedulerError> {
        Ok(Self {
            jobs,
            overdue: ScheduledJob {
                kind: JobKind::Overdue,
                cron: parse_cron(JobKind::Overdue, overdue_cron)?,
                gate: JobGate::default(),
            },
            upcoming: ScheduledJob {
                kind: JobKind::Upcoming,
                cron: parse_cron(JobKind::Upcoming, upcoming_cron)?,
                gate: JobGate::default(),
            },
            cancel: CancellationToken::new(),
        })
    }

    fn job(&self, kind: JobKind) -> &ScheduledJob {
        match kind {
            JobKind::Overdue => &self.overdue,
            JobKind::Upcoming => &self.upcoming,
        }
    }

    pub fn is_running(&self, kind: JobKind) -> bool {
        self.job(kind).gate.is_running()
    }

    /// Run `kind` now, unless a run of the same job is already in flight.
    pub async fn trigger(&self, kind: JobKind) -> Result<JobReport, SchedulerError> {
        let job = self.job(kind);
        let _running = job
            .gate
            .try_enter()
            .ok_or(SchedulerError::AlreadyRunning(kind))?;
        self.jobs.run(kind, Utc::now()).await
    }

    /// Spawn one timer task per job. The tasks exit on [`shutdown`](Self::shutdown).
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        JobKind::ALL
            .into_iter()
            .map(|kind| {
                let scheduler = Arc::clone(self);
                tokio::spawn(async move { scheduler.run_loop(kind).await })
            })
            .collect()
    }

    async fn run_loop(&self, kind: JobKind) {
        let job = self.job(kind);
        info!(job = %kind, "Reminder job scheduled");
        loop {
            let now = Local::now();
            let next = match job.cron.find_next_occurrence(&now, false) {
                Ok(next) => next,
                Err(e) => {
                    error!(job = %kind, error = %e, "No next cron occurrence; stopping job");
                    return;
                }
            };
            let delay = (next - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    info!(job = %kind, "Reminder job stopped");
                    return;
                }
            }

            match self.trigger(job.kind).await {
                Ok(_) => {}
                Err(SchedulerError::AlreadyRunning(_)) => {
                    warn!(job = %kind, "Previous run still in flight; skipping trigger");
                }
                Err(e) => error!(job = %kind, error = %e, "Reminder job failed"),
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
