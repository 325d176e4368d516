//! SQLite implementation of [`ContractStore`] and [`Directory`].
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via `tokio::task::spawn_blocking`. Every read-modify-write
//! runs in a `BEGIN IMMEDIATE` transaction so the status it checks is the
//! status it writes against.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use pactum_core::{
    ContentHash, Contract, ContractId, ContractParty, ContractRecord, ContractStatus, FileRef,
    FirmId, Lifecycle, PartyId, PartyKey, RoleId, SignState, SignatureEvent, Timestamp, UserId,
};
use pactum_perms::{Directory, Firm, LawFirmRole, Membership, RoleFlags};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{ContractStore, ListFilter, SignOutcome};

/// SQLite-based store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path, creating and migrating it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row mapping
// ─────────────────────────────────────────────────────────────────────────────

const CONTRACT_COLUMNS: &str = "id, firm_id, creator_id, title, description, content,
    file_path, file_url, file_hash, file_name, file_content_type, file_size,
    status, is_template, expires_at, deleted_at, created_at, updated_at";

const PARTY_COLUMNS: &str =
    "id, contract_id, user_id, name, email, mobile, role, verifying_key, signed_at, created_at";

const EVENT_COLUMNS: &str =
    "id, contract_id, user_id, party_id, action, signature, ip_address, user_agent, timestamp";

fn parse_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(idx)?;
    text.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_opt_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        t.parse()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn bytes32(bytes: Vec<u8>, idx: usize, name: &str) -> rusqlite::Result<[u8; 32]> {
    bytes
        .try_into()
        .map_err(|_| rusqlite::Error::InvalidColumnType(idx, name.into(), Type::Blob))
}

fn row_to_contract(row: &Row<'_>) -> rusqlite::Result<Contract> {
    let file_path: Option<String> = row.get(6)?;
    let file = match file_path {
        Some(path) => {
            let hash: Vec<u8> = row.get(8)?;
            Some(FileRef {
                path,
                url: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
                hash: ContentHash::from_bytes(bytes32(hash, 8, "file_hash")?),
                file_name: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
                content_type: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
                size: row.get::<_, Option<i64>>(11)?.unwrap_or(0) as u64,
            })
        }
        None => None,
    };

    let lifecycle = match row.get::<_, Option<i64>>(15)? {
        Some(at) => Lifecycle::Deleted { at },
        None => Lifecycle::Active,
    };

    Ok(Contract {
        id: parse_col(row, 0)?,
        firm_id: parse_col(row, 1)?,
        creator_id: parse_col(row, 2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        content: row.get(5)?,
        file,
        status: parse_col(row, 12)?,
        is_template: row.get(13)?,
        expires_at: row.get(14)?,
        lifecycle,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn row_to_party(row: &Row<'_>) -> rusqlite::Result<ContractParty> {
    let verifying_key = row
        .get::<_, Option<Vec<u8>>>(7)?
        .map(|bytes| bytes32(bytes, 7, "verifying_key").map(PartyKey::from_bytes))
        .transpose()?;
    let sign_state = match row.get::<_, Option<i64>>(8)? {
        Some(at) => SignState::Signed { at },
        None => SignState::Unsigned,
    };

    Ok(ContractParty {
        id: parse_col(row, 0)?,
        contract_id: parse_col(row, 1)?,
        user_id: parse_opt_col(row, 2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        mobile: row.get(5)?,
        role: row.get(6)?,
        verifying_key,
        sign_state,
        created_at: row.get(9)?,
    })
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<SignatureEvent> {
    Ok(SignatureEvent {
        id: parse_col(row, 0)?,
        contract_id: parse_col(row, 1)?,
        user_id: parse_col(row, 2)?,
        party_id: parse_col(row, 3)?,
        action: row.get(4)?,
        signature: row.get(5)?,
        ip_address: row.get(6)?,
        user_agent: row.get(7)?,
        timestamp: row.get(8)?,
    })
}

fn row_to_firm(row: &Row<'_>) -> rusqlite::Result<Firm> {
    Ok(Firm {
        id: parse_col(row, 0)?,
        name: row.get(1)?,
        owner_id: parse_col(row, 2)?,
        is_deleted: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn row_to_role(row: &Row<'_>) -> rusqlite::Result<LawFirmRole> {
    Ok(LawFirmRole {
        id: parse_col(row, 0)?,
        firm_id: parse_col(row, 1)?,
        name: row.get(2)?,
        flags: RoleFlags {
            read: row.get(3)?,
            write: row.get(4)?,
            manage: row.get(5)?,
            firm_admin: row.get(6)?,
        },
        is_deleted: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn row_to_membership(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        id: parse_col(row, 0)?,
        firm_id: parse_col(row, 1)?,
        user_id: parse_col(row, 2)?,
        role_id: parse_col(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Status of a live contract, or `NotFound`.
fn live_status(conn: &Connection, id: &ContractId) -> Result<ContractStatus> {
    let status: Option<String> = conn
        .query_row(
            "SELECT status FROM contracts WHERE id = ?1 AND deleted_at IS NULL",
            params![id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    let status = status.ok_or_else(|| StoreError::NotFound(format!("contract {}", id)))?;
    status
        .parse()
        .map_err(|e| StoreError::InvalidData(format!("contract {}: {}", id, e)))
}

fn require_status(
    conn: &Connection,
    id: &ContractId,
    allowed: &[ContractStatus],
) -> Result<ContractStatus> {
    let status = live_status(conn, id)?;
    if !allowed.contains(&status) {
        return Err(StoreError::status_conflict(allowed, status));
    }
    Ok(status)
}

/// `NoParties` if `to` is `pending_signature` and the contract has no party.
fn require_parties(conn: &Connection, id: &ContractId, to: ContractStatus) -> Result<()> {
    if to != ContractStatus::PendingSignature {
        return Ok(());
    }
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM contract_parties WHERE contract_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    if count == 0 {
        return Err(StoreError::NoParties(format!("contract {}", id)));
    }
    Ok(())
}

/// `FileChanged` unless the contract's current file hash equals `expected`.
fn require_file_hash(conn: &Connection, id: &ContractId, expected: &ContentHash) -> Result<()> {
    let stored: Option<Vec<u8>> = conn.query_row(
        "SELECT file_hash FROM contracts WHERE id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )?;
    if stored.as_deref() != Some(expected.as_bytes().as_slice()) {
        return Err(StoreError::FileChanged(format!("contract {}", id)));
    }
    Ok(())
}

fn load_party(
    conn: &Connection,
    contract_id: &ContractId,
    party_id: &PartyId,
) -> Result<Option<ContractParty>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM contract_parties WHERE id = ?1 AND contract_id = ?2",
            PARTY_COLUMNS
        ),
        params![party_id.to_string(), contract_id.to_string()],
        row_to_party,
    )
    .optional()
    .map_err(StoreError::from)
}

#[async_trait]
impl ContractStore for SqliteStore {
    async fn insert_contract(&self, contract: &Contract) -> Result<()> {
        let c = contract.clone();
        self.blocking(move |conn| {
            let file = c.file.as_ref();
            conn.execute(
                &format!(
                    "INSERT INTO contracts ({}) VALUES
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                    CONTRACT_COLUMNS
                ),
                params![
                    c.id.to_string(),
                    c.firm_id.to_string(),
                    c.creator_id.to_string(),
                    c.title,
                    c.description,
                    c.content,
                    file.map(|f| f.path.as_str()),
                    file.map(|f| f.url.as_str()),
                    file.map(|f| f.hash.as_bytes().as_slice()),
                    file.map(|f| f.file_name.as_str()),
                    file.map(|f| f.content_type.as_str()),
                    file.map(|f| f.size as i64),
                    c.status.as_str(),
                    c.is_template,
                    c.expires_at,
                    c.lifecycle.deleted_at(),
                    c.created_at,
                    c.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_contract(&self, id: &ContractId) -> Result<Option<ContractRecord>> {
        let id = *id;
        self.blocking(move |conn| {
            let contract = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM contracts WHERE id = ?1 AND deleted_at IS NULL",
                        CONTRACT_COLUMNS
                    ),
                    params![id.to_string()],
                    row_to_contract,
                )
                .optional()?;
            let contract = match contract {
                Some(c) => c,
                None => return Ok(None),
            };

            let parties = conn
                .prepare(&format!(
                    "SELECT {} FROM contract_parties WHERE contract_id = ?1
                     ORDER BY created_at, rowid",
                    PARTY_COLUMNS
                ))?
                .query_map(params![id.to_string()], row_to_party)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let signature_events = conn
                .prepare(&format!(
                    "SELECT {} FROM signature_events WHERE contract_id = ?1
                     ORDER BY timestamp, rowid",
                    EVENT_COLUMNS
                ))?
                .query_map(params![id.to_string()], row_to_event)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Some(ContractRecord {
                contract,
                parties,
                signature_events,
            }))
        })
        .await
    }

    async fn list_contracts(&self, firm_id: &FirmId, filter: &ListFilter) -> Result<Vec<Contract>> {
        let firm_id = *firm_id;
        let filter = filter.clone();
        self.blocking(move |conn| {
            let mut sql = format!(
                "SELECT {} FROM contracts WHERE firm_id = ?1 AND deleted_at IS NULL",
                CONTRACT_COLUMNS
            );
            let mut values = vec![Value::Text(firm_id.to_string())];

            if let Some(status) = filter.status {
                values.push(Value::Text(status.as_str().to_string()));
                sql.push_str(&format!(" AND status = ?{}", values.len()));
            }
            if let Some(is_template) = filter.is_template {
                values.push(Value::Integer(is_template as i64));
                sql.push_str(&format!(" AND is_template = ?{}", values.len()));
            }

            let dir = filter.direction.keyword();
            sql.push_str(&format!(
                " ORDER BY {} {}, id {}",
                filter.order_by.column(),
                dir,
                dir
            ));

            if let Some(limit) = filter.limit {
                values.push(Value::Integer(limit as i64));
                sql.push_str(&format!(" LIMIT ?{}", values.len()));
                values.push(Value::Integer(filter.offset.unwrap_or(0) as i64));
                sql.push_str(&format!(" OFFSET ?{}", values.len()));
            }

            let contracts = conn
                .prepare(&sql)?
                .query_map(rusqlite::params_from_iter(values.iter()), row_to_contract)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(contracts)
        })
        .await
    }

    async fn update_contract(&self, contract: &Contract, expected: ContractStatus) -> Result<()> {
        let c = contract.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &c.id, &[expected])?;
            if c.status != expected {
                require_parties(&tx, &c.id, c.status)?;
            }
            tx.execute(
                "UPDATE contracts SET title = ?2, description = ?3, content = ?4,
                        status = ?5, expires_at = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    c.id.to_string(),
                    c.title,
                    c.description,
                    c.content,
                    c.status.as_str(),
                    c.expires_at,
                    c.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn transition_status(
        &self,
        id: &ContractId,
        expected: ContractStatus,
        to: ContractStatus,
        at: Timestamp,
    ) -> Result<()> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &id, &[expected])?;
            if to != expected {
                require_parties(&tx, &id, to)?;
            }
            tx.execute(
                "UPDATE contracts SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id.to_string(), to.as_str(), at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn soft_delete_contract(
        &self,
        id: &ContractId,
        allowed: &[ContractStatus],
        at: Timestamp,
    ) -> Result<()> {
        let id = *id;
        let allowed = allowed.to_vec();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &id, &allowed)?;
            tx.execute(
                "UPDATE contracts SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1",
                params![id.to_string(), at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn record_file(&self, id: &ContractId, file: &FileRef, at: Timestamp) -> Result<()> {
        let id = *id;
        let file = file.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            live_status(&tx, &id)?;
            tx.execute(
                "UPDATE contracts SET file_path = ?2, file_url = ?3, file_hash = ?4,
                        file_name = ?5, file_content_type = ?6, file_size = ?7,
                        status = ?8, updated_at = ?9
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    file.path,
                    file.url,
                    file.hash.as_bytes().as_slice(),
                    file.file_name,
                    file.content_type,
                    file.size as i64,
                    ContractStatus::Draft.as_str(),
                    at,
                ],
            )?;
            tx.execute(
                "UPDATE contract_parties SET signed_at = NULL WHERE contract_id = ?1",
                params![id.to_string()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn insert_party(&self, party: &ContractParty) -> Result<()> {
        let p = party.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &p.contract_id, &[ContractStatus::Draft])?;
            tx.execute(
                &format!(
                    "INSERT INTO contract_parties ({}) VALUES
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    PARTY_COLUMNS
                ),
                params![
                    p.id.to_string(),
                    p.contract_id.to_string(),
                    p.user_id.map(|u| u.to_string()),
                    p.name,
                    p.email,
                    p.mobile,
                    p.role,
                    p.verifying_key.as_ref().map(|k| k.as_bytes().as_slice()),
                    p.signed_at(),
                    p.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_party(&self, contract_id: &ContractId, party_id: &PartyId) -> Result<()> {
        let contract_id = *contract_id;
        let party_id = *party_id;
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &contract_id, &[ContractStatus::Draft])?;
            let removed = tx.execute(
                "DELETE FROM contract_parties WHERE id = ?1 AND contract_id = ?2",
                params![party_id.to_string(), contract_id.to_string()],
            )?;
            if removed == 0 {
                return Err(StoreError::PartyNotFound(party_id.to_string()));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn sign_party(
        &self,
        contract_id: &ContractId,
        party_id: &PartyId,
        expected_file: Option<&ContentHash>,
        event: &SignatureEvent,
    ) -> Result<SignOutcome> {
        let contract_id = *contract_id;
        let party_id = *party_id;
        let expected_file = expected_file.copied();
        let event = event.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            require_status(&tx, &contract_id, &[ContractStatus::PendingSignature])?;
            if let Some(expected) = &expected_file {
                require_file_hash(&tx, &contract_id, expected)?;
            }

            let party = load_party(&tx, &contract_id, &party_id)?
                .ok_or_else(|| StoreError::PartyNotFound(party_id.to_string()))?;
            if party.has_signed() {
                return Err(StoreError::PartyAlreadySigned(party_id.to_string()));
            }

            tx.execute(
                "UPDATE contract_parties SET signed_at = ?2 WHERE id = ?1",
                params![party_id.to_string(), event.timestamp],
            )?;

            tx.execute(
                &format!(
                    "INSERT INTO signature_events ({}) VALUES
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    EVENT_COLUMNS
                ),
                params![
                    event.id.to_string(),
                    event.contract_id.to_string(),
                    event.user_id.to_string(),
                    event.party_id.to_string(),
                    event.action,
                    event.signature,
                    event.ip_address,
                    event.user_agent,
                    event.timestamp,
                ],
            )?;

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM contract_parties
                 WHERE contract_id = ?1 AND signed_at IS NULL",
                params![contract_id.to_string()],
                |row| row.get(0),
            )?;

            let contract_signed = remaining == 0;
            if contract_signed {
                tx.execute(
                    "UPDATE contracts SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    params![
                        contract_id.to_string(),
                        ContractStatus::Signed.as_str(),
                        event.timestamp
                    ],
                )?;
            }

            let party = load_party(&tx, &contract_id, &party_id)?
                .ok_or_else(|| StoreError::PartyNotFound(party_id.to_string()))?;
            tx.commit()?;

            Ok(SignOutcome {
                party,
                event,
                contract_signed,
            })
        })
        .await
    }
}

#[async_trait]
impl Directory for SqliteStore {
    async fn get_firm(&self, firm_id: &FirmId) -> pactum_perms::Result<Option<Firm>> {
        let firm_id = *firm_id;
        Ok(self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT id, name, owner_id, is_deleted, created_at FROM firms WHERE id = ?1",
                    params![firm_id.to_string()],
                    row_to_firm,
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?)
    }

    async fn put_firm(&self, firm: &Firm) -> pactum_perms::Result<()> {
        let firm = firm.clone();
        Ok(self
            .blocking(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO firms (id, name, owner_id, is_deleted, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        firm.id.to_string(),
                        firm.name,
                        firm.owner_id.to_string(),
                        firm.is_deleted,
                        firm.created_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }

    async fn get_role(&self, role_id: &RoleId) -> pactum_perms::Result<Option<LawFirmRole>> {
        let role_id = *role_id;
        Ok(self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT id, firm_id, name, can_read, can_write, can_manage, is_admin,
                            is_deleted, created_at, updated_at
                     FROM roles WHERE id = ?1",
                    params![role_id.to_string()],
                    row_to_role,
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?)
    }

    async fn put_role(&self, role: &LawFirmRole) -> pactum_perms::Result<()> {
        let role = role.clone();
        Ok(self
            .blocking(move |conn| {
                conn.execute(
                    "INSERT OR REPLACE INTO roles
                        (id, firm_id, name, can_read, can_write, can_manage, is_admin,
                         is_deleted, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        role.id.to_string(),
                        role.firm_id.to_string(),
                        role.name,
                        role.flags.read,
                        role.flags.write,
                        role.flags.manage,
                        role.flags.firm_admin,
                        role.is_deleted,
                        role.created_at,
                        role.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }

    async fn delete_role(&self, role_id: &RoleId, at: Timestamp) -> pactum_perms::Result<bool> {
        let role_id = *role_id;
        Ok(self
            .blocking(move |conn| {
                let changed = conn.execute(
                    "UPDATE roles SET is_deleted = 1, updated_at = ?2
                     WHERE id = ?1 AND is_deleted = 0",
                    params![role_id.to_string(), at],
                )?;
                Ok(changed > 0)
            })
            .await?)
    }

    async fn list_roles(&self, firm_id: &FirmId) -> pactum_perms::Result<Vec<LawFirmRole>> {
        let firm_id = *firm_id;
        Ok(self
            .blocking(move |conn| {
                let roles = conn
                    .prepare(
                        "SELECT id, firm_id, name, can_read, can_write, can_manage, is_admin,
                                is_deleted, created_at, updated_at
                         FROM roles WHERE firm_id = ?1 AND is_deleted = 0
                         ORDER BY created_at, id",
                    )?
                    .query_map(params![firm_id.to_string()], row_to_role)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(roles)
            })
            .await?)
    }

    async fn get_membership(
        &self,
        user_id: &UserId,
        firm_id: &FirmId,
    ) -> pactum_perms::Result<Option<Membership>> {
        let user_id = *user_id;
        let firm_id = *firm_id;
        Ok(self
            .blocking(move |conn| {
                conn.query_row(
                    "SELECT id, firm_id, user_id, role_id, created_at, updated_at
                     FROM memberships WHERE user_id = ?1 AND firm_id = ?2",
                    params![user_id.to_string(), firm_id.to_string()],
                    row_to_membership,
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?)
    }

    async fn put_membership(&self, membership: &Membership) -> pactum_perms::Result<()> {
        let m = membership.clone();
        Ok(self
            .blocking(move |conn| {
                // REPLACE also drops a row that collides on (user_id, firm_id).
                conn.execute(
                    "INSERT OR REPLACE INTO memberships
                        (id, firm_id, user_id, role_id, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        m.id.to_string(),
                        m.firm_id.to_string(),
                        m.user_id.to_string(),
                        m.role_id.to_string(),
                        m.created_at,
                        m.updated_at,
                    ],
                )?;
                Ok(())
            })
            .await?)
    }

    async fn remove_membership(
        &self,
        user_id: &UserId,
        firm_id: &FirmId,
    ) -> pactum_perms::Result<bool> {
        let user_id = *user_id;
        let firm_id = *firm_id;
        Ok(self
            .blocking(move |conn| {
                let removed = conn.execute(
                    "DELETE FROM memberships WHERE user_id = ?1 AND firm_id = ?2",
                    params![user_id.to_string(), firm_id.to_string()],
                )?;
                Ok(removed > 0)
            })
            .await?)
    }

    async fn list_members(&self, firm_id: &FirmId) -> pactum_perms::Result<Vec<Membership>> {
        let firm_id = *firm_id;
        Ok(self
            .blocking(move |conn| {
                let members = conn
                    .prepare(
                        "SELECT id, firm_id, user_id, role_id, created_at, updated_at
                         FROM memberships WHERE firm_id = ?1
                         ORDER BY created_at, id",
                    )?
                    .query_map(params![firm_id.to_string()], row_to_membership)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(members)
            })
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{NewContract, NewParty, SignatureRequest};
    use pactum_perms::Capability;

    fn contract(firm: FirmId, title: &str, at: Timestamp) -> Contract {
        Contract::new(NewContract::titled(title), firm, UserId::generate(), at)
    }

    fn event(contract_id: ContractId, party_id: PartyId, at: Timestamp) -> SignatureEvent {
        SignatureEvent::signed(
            contract_id,
            party_id,
            UserId::generate(),
            SignatureRequest::new("sig").ip_address("10.0.0.1").user_agent("test"),
            at,
        )
    }

    async fn pending_with_parties(store: &SqliteStore, n: usize) -> (Contract, Vec<PartyId>) {
        let c = contract(FirmId::generate(), "NDA", 1);
        store.insert_contract(&c).await.unwrap();
        let mut ids = Vec::new();
        for i in 0..n {
            let party = ContractParty::new(
                c.id,
                NewParty::named(format!("P{}", i)).email("p@example.com"),
                2 + i as i64,
            );
            ids.push(party.id);
            store.insert_party(&party).await.unwrap();
        }
        store
            .transition_status(&c.id, ContractStatus::Draft, ContractStatus::PendingSignature, 5)
            .await
            .unwrap();
        (c, ids)
    }

    #[tokio::test]
    async fn test_insert_and_get_contract() {
        let store = SqliteStore::open_memory().unwrap();
        let mut c = contract(FirmId::generate(), "NDA", 100);
        c.expires_at = Some(200);
        c.is_template = true;
        store.insert_contract(&c).await.unwrap();

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.contract, c);
        assert!(store.get_contract(&ContractId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_flow() {
        let store = SqliteStore::open_memory().unwrap();
        let (c, parties) = pending_with_parties(&store, 2).await;

        let first = store
            .sign_party(&c.id, &parties[0], None, &event(c.id, parties[0], 10))
            .await
            .unwrap();
        assert!(!first.contract_signed);
        assert_eq!(first.party.signed_at(), Some(10));

        let err = store
            .sign_party(&c.id, &parties[0], None, &event(c.id, parties[0], 11))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::PartyAlreadySigned(_)));

        let second = store
            .sign_party(&c.id, &parties[1], None, &event(c.id, parties[1], 12))
            .await
            .unwrap();
        assert!(second.contract_signed);

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.contract.status, ContractStatus::Signed);
        assert_eq!(record.signature_events.len(), 2);
        assert_eq!(record.signature_events[0].ip_address, "10.0.0.1");
        assert!(record.parties.iter().all(|p| p.has_signed()));
    }

    #[tokio::test]
    async fn test_sign_requires_pending() {
        let store = SqliteStore::open_memory().unwrap();
        let c = contract(FirmId::generate(), "NDA", 1);
        store.insert_contract(&c).await.unwrap();
        let party = ContractParty::new(c.id, NewParty::named("A"), 2);
        store.insert_party(&party).await.unwrap();

        let err = store
            .sign_party(&c.id, &party.id, None, &event(c.id, party.id, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::StatusConflict {
                actual: ContractStatus::Draft,
                ..
            }
        ));
        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert!(record.signature_events.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_last_signers() {
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let (c, parties) = pending_with_parties(&store, 2).await;

        let handles: Vec<_> = parties
            .iter()
            .map(|party_id| {
                let store = store.clone();
                let party_id = *party_id;
                let contract_id = c.id;
                tokio::spawn(async move {
                    let event = event(contract_id, party_id, 10);
                    store
                        .sign_party(&contract_id, &party_id, None, &event)
                        .await
                })
            })
            .collect();

        let mut completions = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().contract_signed {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.contract.status, ContractStatus::Signed);
        assert_eq!(record.signature_events.len(), 2);
    }

    #[tokio::test]
    async fn test_record_file_resets_parties() {
        let store = SqliteStore::open_memory().unwrap();
        let (c, parties) = pending_with_parties(&store, 1).await;
        store
            .sign_party(&c.id, &parties[0], None, &event(c.id, parties[0], 10))
            .await
            .unwrap();

        let file = FileRef {
            path: FileRef::blob_path(&c.id, "nda.pdf"),
            url: format!("/api/contracts/{}/file", c.id),
            hash: ContentHash::hash(b"pdf bytes"),
            file_name: "nda.pdf".into(),
            content_type: "application/pdf".into(),
            size: 9,
        };
        store.record_file(&c.id, &file, 20).await.unwrap();

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.contract.status, ContractStatus::Draft);
        assert_eq!(record.contract.file, Some(file));
        assert_eq!(record.contract.updated_at, 20);
        assert!(!record.parties[0].has_signed());
        assert_eq!(record.signature_events.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_rejects_changed_file() {
        let store = SqliteStore::open_memory().unwrap();
        let (c, parties) = pending_with_parties(&store, 1).await;
        let file = |name: &str, body: &[u8]| FileRef {
            path: FileRef::blob_path(&c.id, name),
            url: format!("/api/contracts/{}/file", c.id),
            hash: ContentHash::hash(body),
            file_name: name.into(),
            content_type: "application/pdf".into(),
            size: body.len() as u64,
        };
        store.record_file(&c.id, &file("v1.pdf", b"v1"), 6).await.unwrap();
        let seen = ContentHash::hash(b"v1");

        store.record_file(&c.id, &file("v2.pdf", b"v2"), 7).await.unwrap();
        store
            .transition_status(&c.id, ContractStatus::Draft, ContractStatus::PendingSignature, 8)
            .await
            .unwrap();

        let err = store
            .sign_party(&c.id, &parties[0], Some(&seen), &event(c.id, parties[0], 9))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::FileChanged(_)));
        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert!(!record.parties[0].has_signed());
        assert!(record.signature_events.is_empty());

        let current = ContentHash::hash(b"v2");
        assert!(store
            .sign_party(&c.id, &parties[0], Some(&current), &event(c.id, parties[0], 10))
            .await
            .unwrap()
            .contract_signed);
    }

    #[tokio::test]
    async fn test_pending_requires_parties() {
        let store = SqliteStore::open_memory().unwrap();
        let c = contract(FirmId::generate(), "NDA", 1);
        store.insert_contract(&c).await.unwrap();

        assert!(matches!(
            store
                .transition_status(&c.id, ContractStatus::Draft, ContractStatus::PendingSignature, 2)
                .await,
            Err(StoreError::NoParties(_))
        ));
        let mut opened = c.clone();
        opened.status = ContractStatus::PendingSignature;
        assert!(matches!(
            store.update_contract(&opened, ContractStatus::Draft).await,
            Err(StoreError::NoParties(_))
        ));

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.contract.status, ContractStatus::Draft);
    }

    #[tokio::test]
    async fn test_party_fields_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let c = contract(FirmId::generate(), "NDA", 1);
        store.insert_contract(&c).await.unwrap();

        let user = UserId::generate();
        let party = ContractParty::new(
            c.id,
            NewParty::named("Alice")
                .user(user)
                .mobile("+15551234567")
                .role("client")
                .verifying_key(PartyKey::from_bytes([7u8; 32])),
            2,
        );
        store.insert_party(&party).await.unwrap();

        let record = store.get_contract(&c.id).await.unwrap().unwrap();
        assert_eq!(record.parties, vec![party]);
        assert!(record.is_party(&user));

        store.delete_party(&c.id, &record.parties[0].id).await.unwrap();
        assert!(matches!(
            store.delete_party(&c.id, &record.parties[0].id).await,
            Err(StoreError::PartyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let store = SqliteStore::open_memory().unwrap();
        let firm = FirmId::generate();
        for (i, title) in ["b", "c", "a"].iter().enumerate() {
            store
                .insert_contract(&contract(firm, title, i as i64))
                .await
                .unwrap();
        }
        let voided = contract(firm, "void", 10);
        store.insert_contract(&voided).await.unwrap();
        store
            .transition_status(&voided.id, ContractStatus::Draft, ContractStatus::Void, 11)
            .await
            .unwrap();
        store
            .insert_contract(&contract(FirmId::generate(), "other firm", 0))
            .await
            .unwrap();

        let all = store.list_contracts(&firm, &ListFilter::new()).await.unwrap();
        let titles: Vec<_> = all.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["void", "a", "c", "b"]);

        let drafts = store
            .list_contracts(
                &firm,
                &ListFilter::new()
                    .status(ContractStatus::Draft)
                    .order_by(crate::traits::OrderField::Title, crate::traits::SortDirection::Asc)
                    .page(2, 1),
            )
            .await
            .unwrap();
        let titles: Vec<_> = drafts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "c"]);

        store
            .soft_delete_contract(&voided.id, &[ContractStatus::Draft, ContractStatus::Void], 12)
            .await
            .unwrap();
        assert_eq!(store.list_contracts(&firm, &ListFilter::new()).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_soft_delete_respects_allowed() {
        let store = SqliteStore::open_memory().unwrap();
        let (c, _) = pending_with_parties(&store, 1).await;
        let err = store
            .soft_delete_contract(&c.id, &[ContractStatus::Draft, ContractStatus::Void], 9)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::StatusConflict { .. }));
        assert!(store.get_contract(&c.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pactum.db");
        let c = contract(FirmId::generate(), "Lease", 1);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.insert_contract(&c).await.unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_contract(&c.id).await.unwrap().unwrap().contract, c);
    }

    #[tokio::test]
    async fn test_directory_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let owner = UserId::generate();
        let firm = Firm::new("Acme LLP", owner, 1);
        store.put_firm(&firm).await.unwrap();
        assert_eq!(store.get_firm(&firm.id).await.unwrap(), Some(firm.clone()));

        let reader = LawFirmRole::new(firm.id, "reader", RoleFlags::of(&[Capability::Read]), 2);
        let admin = LawFirmRole::new(firm.id, "admin", RoleFlags::ALL, 3);
        store.put_role(&reader).await.unwrap();
        store.put_role(&admin).await.unwrap();
        assert_eq!(store.list_roles(&firm.id).await.unwrap(), vec![reader.clone(), admin.clone()]);

        let user = UserId::generate();
        store
            .put_membership(&Membership::new(firm.id, user, reader.id, 4))
            .await
            .unwrap();
        store
            .put_membership(&Membership::new(firm.id, user, admin.id, 5))
            .await
            .unwrap();
        let m = store.get_membership(&user, &firm.id).await.unwrap().unwrap();
        assert_eq!(m.role_id, admin.id);
        assert_eq!(store.list_members(&firm.id).await.unwrap().len(), 1);

        assert!(store.delete_role(&admin.id, 6).await.unwrap());
        assert!(store.get_role(&admin.id).await.unwrap().unwrap().is_deleted);
        assert_eq!(store.list_roles(&firm.id).await.unwrap(), vec![reader]);

        assert!(store.remove_membership(&user, &firm.id).await.unwrap());
        assert!(!store.remove_membership(&user, &firm.id).await.unwrap());
    }
}
