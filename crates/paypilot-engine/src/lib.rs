//! PayPilot Engine crate - conversation engine and reminder scheduler.
//!
//! The engine owns one session per chat and turns inbound events into
//! invoice actions. The scheduler runs the overdue and upcoming reminder
//! jobs on cron timers. Both send through the same [`Messenger`], so the
//! outbound guard sees every message the process emits.

pub mod confirmation;
pub mod engine;
pub mod error;
pub mod format;
pub mod guard;
pub mod messenger;
pub mod reminders;
pub mod scheduler;
pub mod session;

pub use confirmation::{classify_reply, Reply};
pub use engine::{Collaborators, ConversationEngine, DropReason, EngineSettings, EventOutcome};
pub use error::{EngineError, SchedulerError};
pub use guard::OutboundGuard;
pub use messenger::Messenger;
pub use reminders::{days_remaining, JobKind, JobReport, ReminderJobs, ReminderSettings};
pub use scheduler::{JobGate, ReminderScheduler};
pub use session::{ConversationSession, SessionState, SessionTable};
