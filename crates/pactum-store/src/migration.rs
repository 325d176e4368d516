//! Database schema migrations for SQLite.
//!
//! A simple versioned migration system. Each migration transforms the schema
//! from version N to N+1.

use rusqlite::Connection;

use pactum_core::now_millis;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema. Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::debug!(from = current, to = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: contracts, parties, audit trail, and the firm directory.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE contracts (
            id TEXT PRIMARY KEY,
            firm_id TEXT NOT NULL,
            creator_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            file_path TEXT,                    -- contracts/{id}/{file_name}
            file_url TEXT,
            file_hash BLOB,                    -- 32 bytes, SHA-256 of plaintext
            file_name TEXT,
            file_content_type TEXT,
            file_size INTEGER,
            status TEXT NOT NULL,              -- draft|pending_signature|signed|void
            is_template INTEGER NOT NULL DEFAULT 0,
            expires_at INTEGER,
            deleted_at INTEGER,                -- NULL while active
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE contract_parties (
            id TEXT PRIMARY KEY,
            contract_id TEXT NOT NULL REFERENCES contracts(id),
            user_id TEXT,
            name TEXT NOT NULL,
            email TEXT,
            mobile TEXT,
            role TEXT NOT NULL DEFAULT '',
            verifying_key BLOB,                -- 32 bytes, Ed25519
            signed_at INTEGER,                 -- NULL while unsigned
            created_at INTEGER NOT NULL
        );

        -- Append-only: rows are never updated or deleted.
        CREATE TABLE signature_events (
            id TEXT PRIMARY KEY,
            contract_id TEXT NOT NULL REFERENCES contracts(id),
            user_id TEXT NOT NULL,
            party_id TEXT NOT NULL,
            action TEXT NOT NULL,
            signature TEXT NOT NULL,
            ip_address TEXT NOT NULL DEFAULT '',
            user_agent TEXT NOT NULL DEFAULT '',
            timestamp INTEGER NOT NULL
        );

        CREATE TABLE firms (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE roles (
            id TEXT PRIMARY KEY,
            firm_id TEXT NOT NULL,
            name TEXT NOT NULL,
            can_read INTEGER NOT NULL DEFAULT 0,
            can_write INTEGER NOT NULL DEFAULT 0,
            can_manage INTEGER NOT NULL DEFAULT 0,
            is_admin INTEGER NOT NULL DEFAULT 0,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE memberships (
            id TEXT PRIMARY KEY,
            firm_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            role_id TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,

            UNIQUE(user_id, firm_id)
        );

        CREATE INDEX idx_contracts_firm ON contracts(firm_id, deleted_at);
        CREATE INDEX idx_parties_contract ON contract_parties(contract_id);
        CREATE INDEX idx_events_contract ON signature_events(contract_id, timestamp);
        CREATE INDEX idx_roles_firm ON roles(firm_id);
        CREATE INDEX idx_memberships_firm ON memberships(firm_id);
        "#,
    )?;

    Ok(())
}
