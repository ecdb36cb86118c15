//! PayPilot Storage crate - SQLite persistence for invoices and contacts.
//!
//! Provides a WAL-mode SQLite database with migrations, the invoice store
//! and contact directory built on it, and an in-memory invoice store.

pub mod contacts;
pub mod db;
pub mod invoices;
pub mod memory;
pub mod migrations;

pub use contacts::ContactDirectory;
pub use db::Database;
pub use invoices::{new_invoice_id, normalize_id, SqliteInvoiceStore};
pub use memory::MemoryInvoiceStore;
