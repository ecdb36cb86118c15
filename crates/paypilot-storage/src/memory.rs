//! In-memory invoice store.
//!
//! Same semantics as the SQLite store, for ephemeral deployments and tests.
//! Contents are lost on restart.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use paypilot_core::{
    normalize_amount, validate_transition, ChatKey, DraftInvoice, Invoice, InvoiceFilter,
    InvoiceStatus, InvoiceStore, PayPilotError,
};

use crate::invoices::{new_invoice_id, normalize_id};

#[derive(Debug, Default)]
pub struct MemoryInvoiceStore {
    // Insertion order; listing reverses it.
    invoices: Mutex<Vec<Invoice>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Invoice>>, PayPilotError> {
        self.invoices
            .lock()
            .map_err(|e| PayPilotError::Storage(format!("Invoice store lock poisoned: {}", e)))
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn create(&self, draft: &DraftInvoice, owner: &ChatKey) -> Result<Invoice, PayPilotError> {
        let mut invoices = self.lock()?;
        let mut id = new_invoice_id();
        while invoices.iter().any(|i| i.id == id) {
            id = new_invoice_id();
        }
        let now = Utc::now();
        let invoice = Invoice {
            id,
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
        invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn get(&self, id: &str) -> Result<Option<Invoice>, PayPilotError> {
        let id = normalize_id(id);
        Ok(self.lock()?.iter().find(|i| i.id == id).cloned())
    }

    async fn list(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, PayPilotError> {
        Ok(self
            .lock()?
            .iter()
            .rev()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: &str,
        status: InvoiceStatus,
    ) -> Result<Option<Invoice>, PayPilotError> {
        let id = normalize_id(id);
        let mut invoices = self.lock()?;
        let Some(invoice) = invoices.iter_mut().find(|i| i.id == id) else {
            return Ok(None);
        };
        validate_transition(invoice.status, status)?;
        invoice.status = status;
        invoice.updated_at = Utc::now();
        Ok(Some(invoice.clone()))
    }
}
