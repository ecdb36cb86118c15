//! Reminder jobs: overdue transition and upcoming-due notification.
//!
//! Each job is one pass over the store. A pass is idempotent: the overdue
//! job only picks up `PENDING` invoices, and it moves each one it notifies
//! to `OVERDUE`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use paypilot_core::{ChatKey, Invoice, InvoiceFilter, InvoiceStatus, InvoiceStore, PayPilotError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SchedulerError;
use crate::format;
use crate::messenger::Messenger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Overdue,
    Upcoming,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Overdue, JobKind::Upcoming];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Overdue => "overdue",
            JobKind::Upcoming => "upcoming",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Overdue => "Overdue",
            JobKind::Upcoming => "Upcoming",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overdue" => Ok(JobKind::Overdue),
            "upcoming" => Ok(JobKind::Upcoming),
            other => Err(SchedulerError::UnknownJob(other.to_string())),
        }
    }
}

/// Counts from one job run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub scanned: usize,
    pub transitioned: usize,
    pub notified: usize,
    pub skipped_no_contact: usize,
    pub failed: usize,
}

impl JobReport {
    /// Whether the run changed or sent anything worth telling the operator.
    pub fn has_activity(&self) -> bool {
        self.transitioned + self.notified > 0
    }

    fn record(&mut self, delivery: Delivery) {
        match delivery {
            Delivery::Sent => self.notified += 1,
            Delivery::NoContact => self.skipped_no_contact += 1,
            Delivery::Failed => self.failed += 1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ReminderSettings {
    pub operator: ChatKey,
    pub upcoming_window: Duration,
    pub currency_symbol: String,
}

/// Whole days until `due`, rounded up. Zero or less means due today.
pub fn days_remaining(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let secs = (due - now).num_seconds();
    if secs <= 0 {
        return 0;
    }
    (secs + 86_399) / 86_400
}

enum Delivery {
    Sent,
    NoContact,
    Failed,
}

pub struct ReminderJobs {
    store: Arc<dyn InvoiceStore>,
    messenger: Messenger,
    settings: ReminderSettings,
}

impl ReminderJobs {
    pub fn new(store: Arc<dyn InvoiceStore>, messenger: Messenger, settings: ReminderSettings) -> Self {
        Self {
            store,
            messenger,
            settings,
        }
    }

    /// Run one pass of `kind` as of `now`, then send the operator a digest
    /// if anything happened.
    pub async fn run(&self, kind: JobKind, now: DateTime<Utc>) -> Result<JobReport, SchedulerError> {
        let report = match kind {
            JobKind::Overdue => self.run_overdue(now).await?,
            JobKind::Upcoming => self.run_upcoming(now).await?,
        };
        info!(
            job = %kind,
            scanned = report.scanned,
            transitioned = report.transitioned,
            notified = report.notified,
            skipped_no_contact = report.skipped_no_contact,
            failed = report.failed,
            "Reminder job finished"
        );
        if report.has_activity() {
            self.messenger
                .notify(&self.settings.operator, format::job_digest(kind, &report))
                .await;
        }
        Ok(report)
    }

    async fn run_overdue(&self, now: DateTime<Utc>) -> Result<JobReport, SchedulerError> {
        let filter = InvoiceFilter {
            status: Some(InvoiceStatus::Pending),
            owner: Some(self.settings.operator.clone()),
            due_before: Some(now),
            ..Default::default()
        };
        let candidates = self.store.list(&filter).await?;
        let mut report = JobReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for candidate in candidates {
            let invoice = match self.store.update_status(&candidate.id, InvoiceStatus::Overdue).await {
                Ok(Some(invoice)) => invoice,
                Ok(None) => {
                    warn!(id = %candidate.id, "Invoice vanished before overdue transition");
                    report.failed += 1;
                    continue;
                }
                Err(PayPilotError::InvalidTransition { from, .. }) => {
                    // Settled between the scan and the update.
                    debug!(id = %candidate.id, status = %from, "Skipping invoice no longer pending");
                    continue;
                }
                Err(e) => {
                    warn!(id = %candidate.id, error = %e, "Overdue transition failed");
                    report.failed += 1;
                    continue;
                }
            };
            report.transitioned += 1;

            let text = format::overdue_reminder(&invoice, &self.settings.currency_symbol);
            report.record(self.remind(&invoice, text).await);
        }
        Ok(report)
    }

    async fn run_upcoming(&self, now: DateTime<Utc>) -> Result<JobReport, SchedulerError> {
        // due_before is exclusive; the window end is inclusive.
        let filter = InvoiceFilter {
            status: Some(InvoiceStatus::Pending),
            owner: Some(self.settings.operator.clone()),
            due_after: Some(now),
            due_before: Some(now + self.settings.upcoming_window + Duration::milliseconds(1)),
            ..Default::default()
        };
        let candidates = self.store.list(&filter).await?;
        let mut report = JobReport {
            scanned: candidates.len(),
            ..Default::default()
        };

        for invoice in candidates {
            let days = days_remaining(invoice.due_date, now);
            let text = format::upcoming_reminder(&invoice, days, &self.settings.currency_symbol);
            report.record(self.remind(&invoice, text).await);
        }
        Ok(report)
    }

    async fn remind(&self, invoice: &Invoice, text: String) -> Delivery {
        let contact = match self
            .messenger
            .resolve_contact(&invoice.customer_name, invoice.customer_phone.as_deref())
            .await
        {
            Ok(Some(chat)) => chat,
            Ok(None) => {
                debug!(id = %invoice.id, customer = %invoice.customer_name, "No contact for reminder");
                return Delivery::NoContact;
            }
            Err(e) => {
                warn!(id = %invoice.id, error = %e, "Contact lookup failed");
                return Delivery::Failed;
            }
        };

        if self.messenger.notify(&contact, text).await {
            Delivery::Sent
        } else {
            Delivery::Failed
        }
    }
}
