//! Reply texts sent to the operator and to customers.

use chrono::{DateTime, Utc};
use paypilot_core::{format_amount, DraftInvoice, Invoice};

use crate::reminders::{JobKind, JobReport};

pub const HELP_MESSAGE: &str = "👋 I can help you manage invoices:\n\
• *Create*: \"Invoice to Ravi ₹5000 for logo design due in 5 days\"\n\
• *Mark paid*: \"paid 3f2a9c1b\"\n\
• *Check status*: \"status 3f2a9c1b\"\n\
• *List*: \"list invoices\"\n\
You can also send a voice note.";

pub const REPROMPT: &str = "Please reply *yes* to create this invoice or *no* to cancel.";
pub const CANCELLED: &str = "🚫 Draft cancelled. Nothing was saved.";
pub const EMPTY_LIST: &str =
    "📭 No invoices yet. Try: \"Invoice to Ravi ₹5000 for logo design due in 5 days\"";
pub const VOICE_ACK: &str = "🎙️ Got your voice note, transcribing…";
pub const VOICE_FAILED: &str =
    "Sorry, I couldn't make out that voice note. Please try again or type your request.";
pub const SAVE_FAILED: &str = "Could not save the invoice. Please try again.";
pub const PAID_USAGE: &str = "Include the invoice id, e.g. *paid 3f2a9c1b*.";
pub const STATUS_USAGE: &str = "Include the invoice id, e.g. *status 3f2a9c1b*.";

/// Invoice ids are shown uppercase.
pub fn display_id(id: &str) -> String {
    id.to_ascii_uppercase()
}

pub fn display_date(date: &DateTime<Utc>) -> String {
    date.format("%d %b %Y").to_string()
}

pub fn draft_summary(draft: &DraftInvoice, symbol: &str) -> String {
    let mut lines = vec![
        "📝 *Invoice draft*".to_string(),
        format!("Customer: {}", draft.customer_name),
    ];
    if let Some(phone) = &draft.customer_phone {
        lines.push(format!("Phone: {}", phone));
    }
    lines.push(format!("Amount: {}", format_amount(draft.amount, symbol)));
    lines.push(format!("For: {}", draft.description));
    lines.push(format!("Due: {}", display_date(&draft.due_date)));
    lines.push(String::new());
    lines.push("Reply *yes* to confirm or *no* to cancel.".to_string());
    lines.join("\n")
}

fn invoice_details(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "Customer: {}\nAmount: {}\nFor: {}\nDue: {}\nStatus: {}",
        invoice.customer_name,
        format_amount(invoice.amount, symbol),
        invoice.description,
        display_date(&invoice.due_date),
        invoice.status
    )
}

pub fn created_summary(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "✅ Invoice *{}* created\n{}",
        display_id(&invoice.id),
        invoice_details(invoice, symbol)
    )
}

pub fn document_caption(invoice: &Invoice) -> String {
    format!("Invoice {}", display_id(&invoice.id))
}

pub fn paid_confirmation(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "✅ Invoice *{}* marked as paid.\nCustomer: {}\nAmount: {}",
        display_id(&invoice.id),
        invoice.customer_name,
        format_amount(invoice.amount, symbol)
    )
}

pub fn status_reply(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "📄 Invoice *{}*\n{}",
        display_id(&invoice.id),
        invoice_details(invoice, symbol)
    )
}

/// Newest-first listing, at most `limit` lines plus an overflow line.
pub fn list_reply(invoices: &[Invoice], limit: usize, symbol: &str) -> String {
    if invoices.is_empty() {
        return EMPTY_LIST.to_string();
    }
    let mut lines = vec![format!("📋 *Your invoices* ({})", invoices.len())];
    for (i, invoice) in invoices.iter().take(limit).enumerate() {
        lines.push(format!(
            "{}. {} · {} · {} · {} · due {}",
            i + 1,
            display_id(&invoice.id),
            invoice.customer_name,
            format_amount(invoice.amount, symbol),
            invoice.status,
            display_date(&invoice.due_date)
        ));
    }
    if invoices.len() > limit {
        lines.push(format!("…and {} more", invoices.len() - limit));
    }
    lines.join("\n")
}

pub fn transcript_echo(transcript: &str) -> String {
    format!("🗣 \"{}\"", transcript)
}

pub fn customer_message(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "Hello {}, please find attached invoice {} for {} ({}), due on {}. Thank you!",
        invoice.customer_name,
        display_id(&invoice.id),
        format_amount(invoice.amount, symbol),
        invoice.description,
        display_date(&invoice.due_date)
    )
}

pub fn overdue_reminder(invoice: &Invoice, symbol: &str) -> String {
    format!(
        "Hello {}, invoice {} for {} was due on {} and is now overdue. Please arrange payment at the earliest.",
        invoice.customer_name,
        display_id(&invoice.id),
        format_amount(invoice.amount, symbol),
        display_date(&invoice.due_date)
    )
}

pub fn upcoming_reminder(invoice: &Invoice, days_remaining: i64, symbol: &str) -> String {
    let when = match days_remaining {
        d if d <= 0 => "today".to_string(),
        1 => "in 1 day".to_string(),
        d => format!("in {} days", d),
    };
    format!(
        "Hello {}, a friendly reminder that invoice {} for {} is due {} ({}).",
        invoice.customer_name,
        display_id(&invoice.id),
        format_amount(invoice.amount, symbol),
        when,
        display_date(&invoice.due_date)
    )
}

pub fn job_digest(kind: JobKind, report: &JobReport) -> String {
    let mut parts = Vec::new();
    if kind == JobKind::Overdue {
        parts.push(format!("{} marked overdue", report.transitioned));
    }
    parts.push(format!(
        "{} reminder{} sent",
        report.notified,
        if report.notified == 1 { "" } else { "s" }
    ));
    if report.skipped_no_contact > 0 {
        parts.push(format!("{} without a contact", report.skipped_no_contact));
    }
    if report.failed > 0 {
        parts.push(format!("{} failed", report.failed));
    }
    format!("⏰ {} scan: {}.", kind.label(), parts.join(", "))
}
