mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{harness, past_grace, Harness, OPERATOR};
use paypilot_core::{ChatKey, InboundEvent, InvoiceStatus, InvoiceStore};
use paypilot_engine::{
    DropReason, EventOutcome, JobKind, JobReport, ReminderJobs, ReminderScheduler,
    ReminderSettings, SchedulerError,
};

fn jobs(h: &Harness) -> ReminderJobs {
    let store: Arc<dyn InvoiceStore> = h.store.clone();
    ReminderJobs::new(
        store,
        h.engine.messenger().clone(),
        ReminderSettings {
            operator: ChatKey::from(OPERATOR),
            upcoming_window: Duration::days(2),
            currency_symbol: "₹".to_string(),
        },
    )
}

#[tokio::test(start_paused = true)]
async fn overdue_job_transitions_and_notifies_once() {
    let h = harness();
    h.transport.add_contact("Meera", "meera@chat");
    let now = Utc::now();
    let late = h.store.seed("Meera", 2500.0, now - Duration::days(2), OPERATOR).await;
    let future = h.store.seed("Meera", 900.0, now + Duration::days(5), OPERATOR).await;

    let jobs = jobs(&h);
    let report = jobs.run(JobKind::Overdue, now).await.unwrap();
    assert_eq!(
        report,
        JobReport {
            scanned: 1,
            transitioned: 1,
            notified: 1,
            skipped_no_contact: 0,
            failed: 0,
        }
    );
    assert_eq!(h.store.get_status(&late.id).await, Some(InvoiceStatus::Overdue));
    assert_eq!(h.store.get_status(&future.id).await, Some(InvoiceStatus::Pending));

    let reminders = h.transport.texts_to("meera@chat");
    assert_eq!(reminders.len(), 1);
    assert!(reminders[0].contains(&late.id.to_uppercase()));
    assert!(reminders[0].contains("is now overdue"));
    assert_eq!(
        h.transport.last_text_to(OPERATOR),
        "⏰ Overdue scan: 1 marked overdue, 1 reminder sent."
    );

    // Second pass finds nothing left to do and stays quiet.
    h.transport.clear();
    let again = jobs.run(JobKind::Overdue, now).await.unwrap();
    assert_eq!(again, JobReport::default());
    assert!(h.transport.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn overdue_job_continues_past_failures() {
    let h = harness();
    h.transport.add_contact("Asha", "asha@chat");
    h.transport.add_contact("Kiran", "kiran@chat");
    h.transport.fail_sends_to("kiran@chat");
    let now = Utc::now();
    let broken = h.store.seed("Asha", 100.0, now - Duration::days(3), OPERATOR).await;
    h.store.seed("Asha", 200.0, now - Duration::days(2), OPERATOR).await;
    h.store.seed("Kiran", 300.0, now - Duration::days(1), OPERATOR).await;
    h.store.seed("Nobody", 400.0, now - Duration::hours(1), OPERATOR).await;
    h.store.fail_update_for(&broken.id);

    let report = jobs(&h).run(JobKind::Overdue, now).await.unwrap();
    assert_eq!(
        report,
        JobReport {
            scanned: 4,
            transitioned: 3,
            notified: 1,
            skipped_no_contact: 1,
            failed: 2,
        }
    );
    assert_eq!(h.store.get_status(&broken.id).await, Some(InvoiceStatus::Pending));
    assert_eq!(
        h.transport.last_text_to(OPERATOR),
        "⏰ Overdue scan: 3 marked overdue, 1 reminder sent, 1 without a contact, 2 failed."
    );
}

#[tokio::test(start_paused = true)]
async fn overdue_job_skips_settled_invoices() {
    let h = harness();
    let now = Utc::now();
    let paid = h.store.seed("Ravi", 100.0, now - Duration::days(1), OPERATOR).await;
    h.store.update_status(&paid.id, InvoiceStatus::Paid).await.unwrap();

    let report = jobs(&h).run(JobKind::Overdue, now).await.unwrap();
    assert_eq!(report, JobReport::default());
    assert_eq!(h.store.get_status(&paid.id).await, Some(InvoiceStatus::Paid));
}

#[tokio::test(start_paused = true)]
async fn scans_only_cover_the_operators_invoices() {
    let h = harness();
    h.transport.add_contact("Meera", "meera@chat");
    let now = Utc::now();
    let late = h.store.seed("Meera", 100.0, now - Duration::days(1), "former@chat").await;
    let soon = h.store.seed("Meera", 200.0, now + Duration::days(1), "former@chat").await;

    let jobs = jobs(&h);
    assert_eq!(jobs.run(JobKind::Overdue, now).await.unwrap(), JobReport::default());
    assert_eq!(jobs.run(JobKind::Upcoming, now).await.unwrap(), JobReport::default());

    assert_eq!(h.store.get_status(&late.id).await, Some(InvoiceStatus::Pending));
    assert_eq!(h.store.get_status(&soon.id).await, Some(InvoiceStatus::Pending));
    assert!(h.transport.all().is_empty());
}

#[tokio::test(start_paused = true)]
async fn upcoming_job_states_days_remaining_without_status_change() {
    let h = harness();
    h.transport.add_contact("Ravi", "ravi@chat");
    h.transport.add_contact("Meera", "meera@chat");
    let now = Utc::now();
    let soon = h.store.seed("Ravi", 1000.0, now + Duration::hours(36), OPERATOR).await;
    h.store.seed("Meera", 500.0, now, OPERATOR).await;
    h.store.seed("Ravi", 700.0, now + Duration::days(3), OPERATOR).await;
    h.store.seed("Ravi", 700.0, now - Duration::hours(1), OPERATOR).await;

    let report = jobs(&h).run(JobKind::Upcoming, now).await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.notified, 2);
    assert_eq!(report.transitioned, 0);

    let ravi = h.transport.texts_to("ravi@chat");
    assert_eq!(ravi.len(), 1);
    assert!(ravi[0].contains(&soon.id.to_uppercase()));
    assert!(ravi[0].contains("is due in 2 days"));
    assert!(h.transport.texts_to("meera@chat")[0].contains("is due today"));
    assert_eq!(h.store.get_status(&soon.id).await, Some(InvoiceStatus::Pending));
    assert_eq!(
        h.transport.last_text_to(OPERATOR),
        "⏰ Upcoming scan: 2 reminders sent."
    );
}

#[tokio::test(start_paused = true)]
async fn upcoming_window_end_is_inclusive() {
    let h = harness();
    h.transport.add_contact("Ravi", "ravi@chat");
    let now = Utc::now();
    h.store.seed("Ravi", 100.0, now + Duration::days(2), OPERATOR).await;

    let report = jobs(&h).run(JobKind::Upcoming, now).await.unwrap();
    assert_eq!(report.notified, 1);
}

#[tokio::test(start_paused = true)]
async fn no_digest_without_activity() {
    let h = harness();
    let now = Utc::now();
    h.store.seed("Nobody", 100.0, now + Duration::days(1), OPERATOR).await;

    let report = jobs(&h).run(JobKind::Upcoming, now).await.unwrap();
    assert_eq!(report.skipped_no_contact, 1);
    assert!(h.transport.texts_to(OPERATOR).is_empty());
}

#[tokio::test(start_paused = true)]
async fn store_failure_fails_the_run() {
    let h = harness();
    h.store.fail_reads();
    assert!(matches!(
        jobs(&h).run(JobKind::Overdue, Utc::now()).await,
        Err(SchedulerError::Store(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn scheduler_digest_raises_operator_guard() {
    let h = harness();
    h.transport.add_contact("Meera", "meera@chat");
    h.store
        .seed("Meera", 100.0, Utc::now() - Duration::days(1), OPERATOR)
        .await;

    let scheduler = ReminderScheduler::new(jobs(&h), "0 9 * * *", "0 10 * * *").unwrap();
    let report = scheduler.trigger(JobKind::Overdue).await.unwrap();
    assert_eq!(report.transitioned, 1);

    // The digest echo arrives while the shared guard is up.
    let digest = h.transport.last_text_to(OPERATOR);
    assert_eq!(
        h.engine.handle_event(InboundEvent::text(OPERATOR, digest)).await,
        EventOutcome::Dropped(DropReason::Echo)
    );
    past_grace().await;
    assert_eq!(
        h.engine
            .handle_event(InboundEvent::text(OPERATOR, "list invoices"))
            .await,
        EventOutcome::Processed
    );
}
