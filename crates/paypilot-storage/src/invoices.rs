//! SQLite-backed invoice store.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, ErrorCode, OptionalExtension};
use tracing::{debug, warn};

use paypilot_core::{
    normalize_amount, validate_transition, ChatKey, DraftInvoice, Invoice, InvoiceFilter,
    InvoiceStatus, InvoiceStore, PayPilotError,
};

use crate::db::{blocking, storage_err, Database};

const SELECT_COLUMNS: &str = "SELECT id, customer_name, customer_phone, amount, description, \
     due_date, status, owner_chat, created_at, updated_at FROM invoices";

/// Attempts at drawing an unused id before giving up.
const ID_ATTEMPTS: usize = 5;

/// Draw a fresh 8-character lowercase hex invoice id.
pub fn new_invoice_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Normalize a user-supplied id for lookup.
pub fn normalize_id(id: &str) -> String {
    id.trim().trim_start_matches('#').to_ascii_lowercase()
}

/// Invoice store persisting to the `invoices` table.
#[derive(Debug, Clone)]
pub struct SqliteInvoiceStore {
    db: Arc<Database>,
}

impl SqliteInvoiceStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceStore for SqliteInvoiceStore {
    async fn create(&self, draft: &DraftInvoice, owner: &ChatKey) -> Result<Invoice, PayPilotError> {
        let draft = draft.clone();
        let owner = owner.clone();
        blocking(&self.db, move |conn| insert_invoice(conn, &draft, &owner)).await
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, PayPilotError> {
        let id = normalize_id(id);
        blocking(&self.db, move |conn| find_invoice(conn, &id)).await
    }

    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, PayPilotError> {
        let filter = filter.clone();
        blocking(&self.db, move |conn| list_invoices(conn, &filter)).await
    }

    async fn update_status(
        &self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, PayPilotError> {
        let id = normalize_id(id);
        blocking(&self.db, move |conn| transition_invoice(conn, &id, status)).await
    }
}

fn insert_invoice(
    conn: &Connection,
    draft: &DraftInvoice,
    owner: &ChatKey,
) -> Result<Invoice, PayPilotError> {
    let now = now_millis();
    for _ in 0..ID_ATTEMPTS {
        let invoice = Invoice {
            id: new_invoice_id(),
            customer_name: draft.customer_name.clone(),
            customer_phone: draft.customer_phone.clone(),
            amount: normalize_amount(draft.amount).unwrap_or(0.0),
            description: draft.description.clone(),
            due_date: draft.due_date,
            status: InvoiceStatus::Pending,
            owner_chat: owner.clone(),
            created_at: now,
            updated_at: now,
        };

        let result = conn.execute(
            "INSERT INTO invoices (id, customer_name, customer_phone, amount, description,
                                   due_date, status, owner_chat, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                invoice.id,
                invoice.customer_name,
                invoice.customer_phone,
                invoice.amount,
                invoice.description,
                invoice.due_date.timestamp_millis(),
                invoice.status.as_str(),
                invoice.owner_chat.as_str(),
                invoice.created_at.timestamp_millis(),
                invoice.updated_at.timestamp_millis(),
            ],
        );

        match result {
            Ok(_) => {
                debug!(id = %invoice.id, customer = %invoice.customer_name, "Invoice created");
                return Ok(invoice);
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                warn!(id = %invoice.id, "Invoice id collision, drawing another");
            }
            Err(e) => {
                return Err(PayPilotError::Storage(format!(
                    "Failed to save invoice: {}",
                    e
                )))
            }
        }
    }
    Err(PayPilotError::Storage(
        "Could not allocate a unique invoice id".to_string(),
    ))
}

fn find_invoice(conn: &Connection, id: &str) -> Result<Option<Invoice>, PayPilotError> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    let row = conn
        .query_row(&sql, rusqlite::params![id], row_to_invoice)
        .optional()
        .map_err(storage_err)?;
    row.transpose()
}

fn list_invoices(conn: &Connection, filter: &InvoiceFilter) -> Result<Vec<Invoice>, PayPilotError> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push("status = ?");
        params.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(ref owner) = filter.owner {
        clauses.push("owner_chat = ?");
        params.push(Value::Text(owner.as_str().to_string()));
    }
    if let Some(before) = filter.due_before {
        clauses.push("due_date < ?");
        params.push(Value::Integer(before.timestamp_millis()));
    }
    if let Some(after) = filter.due_after {
        clauses.push("due_date >= ?");
        params.push(Value::Integer(after.timestamp_millis()));
    }

    let mut sql = SELECT_COLUMNS.to_string();
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at DESC, rowid DESC");

    let mut stmt = conn.prepare(&sql).map_err(storage_err)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params), row_to_invoice)
        .map_err(storage_err)?;

    let mut invoices = Vec::new();
    for row in rows {
        invoices.push(row.map_err(storage_err)??);
    }
    Ok(invoices)
}

/// Check and apply a status change under one transaction so that no other
/// writer can interleave between the read and the write.
fn transition_invoice(
    conn: &Connection,
    id: &str,
    to: InvoiceStatus,
) -> Result<Option<Invoice>, PayPilotError> {
    let tx = conn.unchecked_transaction().map_err(storage_err)?;

    let Some(mut invoice) = find_invoice(&tx, id)? else {
        return Ok(None);
    };
    validate_transition(invoice.status, to)?;

    let now = now_millis();
    let changed = tx
        .execute(
            "UPDATE invoices SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
            rusqlite::params![
                to.as_str(),
                now.timestamp_millis(),
                id,
                invoice.status.as_str()
            ],
        )
        .map_err(storage_err)?;
    if changed != 1 {
        return Err(PayPilotError::Storage(format!(
            "Invoice {} changed concurrently",
            id
        )));
    }
    tx.commit().map_err(storage_err)?;

    debug!(id = %id, from = %invoice.status, to = %to, "Invoice status updated");
    invoice.status = to;
    invoice.updated_at = now;
    Ok(Some(invoice))
}

/// Row mapper returning the domain conversion result as the row value so
/// that status parse failures surface as storage errors.
fn row_to_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Invoice, PayPilotError>> {
    let status: String = row.get(6)?;
    let owner: String = row.get(7)?;
    let due: i64 = row.get(5)?;
    let created: i64 = row.get(8)?;
    let updated: i64 = row.get(9)?;
    let invoice = Invoice {
        id: row.get(0)?,
        customer_name: row.get(1)?,
        customer_phone: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        due_date: from_millis(due),
        status: InvoiceStatus::Pending,
        owner_chat: ChatKey::new(owner),
        created_at: from_millis(created),
        updated_at: from_millis(updated),
    };
    Ok(status
        .parse::<InvoiceStatus>()
        .map(|status| Invoice { status, ..invoice })
        .map_err(PayPilotError::Storage))
}

fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}
