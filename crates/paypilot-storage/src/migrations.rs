//! Database schema migrations.
//!
//! Applies the initial schema: invoices, contacts and the
//! schema_migrations tracking table.

use rusqlite::Connection;
use tracing::info;

use paypilot_core::PayPilotError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), PayPilotError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| PayPilotError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| PayPilotError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema. Timestamps are epoch milliseconds.
fn apply_v1(conn: &Connection) -> Result<(), PayPilotError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS invoices (
            id              TEXT PRIMARY KEY NOT NULL,
            customer_name   TEXT NOT NULL,
            customer_phone  TEXT,
            amount          REAL NOT NULL DEFAULT 0
                            CHECK (amount >= 0),
            description     TEXT NOT NULL,
            due_date        INTEGER NOT NULL,
            status          TEXT NOT NULL DEFAULT 'PENDING'
                            CHECK (status IN ('DRAFT', 'PENDING', 'PAID', 'OVERDUE')),
            owner_chat      TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_invoices_owner
            ON invoices (owner_chat, created_at DESC);

        CREATE INDEX IF NOT EXISTS idx_invoices_status_due
            ON invoices (status, due_date ASC);

        CREATE TABLE IF NOT EXISTS contacts (
            chat_key        TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            profile_name    TEXT,
            phone           TEXT,
            updated_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_contacts_phone
            ON contacts (phone)
            WHERE phone IS NOT NULL;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| PayPilotError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
