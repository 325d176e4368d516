//! In-memory implementations of the storage traits.
//!
//! These are primarily for testing. They have the same semantics as SQLite
//! but keep everything in memory. Every contract operation runs entirely
//! under one write guard, which gives the same atomicity as a transaction.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;

use pactum_core::{
    ContentHash, Contract, ContractId, ContractParty, ContractRecord, ContractStatus, FileRef, FirmId,
    Lifecycle, PartyId, SignatureEvent, Timestamp,
};

use crate::error::{Result, StoreError};
use crate::traits::{
    BlobObject, BlobStore, ContractStore, ListFilter, OrderField, SignOutcome, SortDirection,
};

/// In-memory contract store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryContractStore {
    inner: RwLock<MemoryContractInner>,
    fail_writes: AtomicBool,
}

#[derive(Default)]
struct MemoryContractInner {
    contracts: HashMap<ContractId, Contract>,
    /// Parties per contract, in insertion order.
    parties: HashMap<ContractId, Vec<ContractParty>>,
    /// Audit trail per contract, append-only.
    events: HashMap<ContractId, Vec<SignatureEvent>>,
}

impl MemoryContractInner {
    fn require_parties(&self, id: &ContractId, to: ContractStatus) -> Result<()> {
        let count = self.parties.get(id).map_or(0, Vec::len);
        if to == ContractStatus::PendingSignature && count == 0 {
            return Err(StoreError::NoParties(format!("contract {}", id)));
        }
        Ok(())
    }

    fn live_mut(&mut self, id: &ContractId) -> Result<&mut Contract> {
        self.contracts
            .get_mut(id)
            .filter(|c| !c.is_deleted())
            .ok_or_else(|| StoreError::NotFound(format!("contract {}", id)))
    }
}

impl MemoryContractStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryContractInner::default()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every mutating call fail with `Unavailable` until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryContractInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryContractInner>> {
        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryContractStore {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(a: &Contract, b: &Contract, field: OrderField) -> Ordering {
    match field {
        OrderField::CreatedAt => a.created_at.cmp(&b.created_at),
        OrderField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        OrderField::Title => a.title.cmp(&b.title),
        OrderField::Status => a.status.as_str().cmp(b.status.as_str()),
        // None sorts first, as NULL does in SQLite.
        OrderField::ExpiresAt => a.expires_at.cmp(&b.expires_at),
    }
}

#[async_trait]
impl ContractStore for MemoryContractStore {
    async fn insert_contract(&self, contract: &Contract) -> Result<()> {
        let mut inner = self.write()?;
        if inner.contracts.contains_key(&contract.id) {
            return Err(StoreError::InvalidData(format!(
                "contract {} already exists",
                contract.id
            )));
        }
        inner.contracts.insert(contract.id, contract.clone());
        Ok(())
    }

    async fn get_contract(&self, id: &ContractId) -> Result<Option<ContractRecord>> {
        let inner = self.read()?;
        let contract = match inner.contracts.get(id) {
            Some(c) if !c.is_deleted() => c.clone(),
            _ => return Ok(None),
        };
        Ok(Some(ContractRecord {
            contract,
            parties: inner.parties.get(id).cloned().unwrap_or_default(),
            signature_events: inner.events.get(id).cloned().unwrap_or_default(),
        }))
    }

    async fn list_contracts(&self, firm_id: &FirmId, filter: &ListFilter) -> Result<Vec<Contract>> {
        let inner = self.read()?;
        let mut contracts: Vec<Contract> = inner
            .contracts
            .values()
            .filter(|c| &c.firm_id == firm_id && !c.is_deleted() && filter.matches(c))
            .cloned()
            .collect();

        contracts.sort_by(|a, b| {
            let ord = compare(a, b, filter.order_by).then_with(|| a.id.cmp(&b.id));
            match filter.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        if let Some(limit) = filter.limit {
            let offset = filter.offset.unwrap_or(0) as usize;
            contracts = contracts
                .into_iter()
                .skip(offset)
                .take(limit as usize)
                .collect();
        }
        Ok(contracts)
    }

    async fn update_contract(&self, contract: &Contract, expected: ContractStatus) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(&contract.id)?;
        if stored.status != expected {
            return Err(StoreError::status_conflict(&[expected], stored.status));
        }
        if contract.status != expected {
            inner.require_parties(&contract.id, contract.status)?;
        }
        let stored = inner.live_mut(&contract.id)?;
        stored.title = contract.title.clone();
        stored.description = contract.description.clone();
        stored.content = contract.content.clone();
        stored.status = contract.status;
        stored.expires_at = contract.expires_at;
        stored.updated_at = contract.updated_at;
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &ContractId,
        expected: ContractStatus,
        to: ContractStatus,
        at: Timestamp,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(id)?;
        if stored.status != expected {
            return Err(StoreError::status_conflict(&[expected], stored.status));
        }
        if to != expected {
            inner.require_parties(id, to)?;
        }
        let stored = inner.live_mut(id)?;
        stored.status = to;
        stored.updated_at = at;
        Ok(())
    }

    async fn soft_delete_contract(
        &self,
        id: &ContractId,
        allowed: &[ContractStatus],
        at: Timestamp,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(id)?;
        if !allowed.contains(&stored.status) {
            return Err(StoreError::status_conflict(allowed, stored.status));
        }
        stored.lifecycle = Lifecycle::Deleted { at };
        stored.updated_at = at;
        Ok(())
    }

    async fn record_file(&self, id: &ContractId, file: &FileRef, at: Timestamp) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(id)?;
        stored.file = Some(file.clone());
        stored.status = ContractStatus::Draft;
        stored.updated_at = at;

        if let Some(parties) = inner.parties.get_mut(id) {
            for party in parties.iter_mut() {
                party.reset_signature();
            }
        }
        Ok(())
    }

    async fn insert_party(&self, party: &ContractParty) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(&party.contract_id)?;
        if !stored.status.parties_editable() {
            return Err(StoreError::status_conflict(
                &[ContractStatus::Draft],
                stored.status,
            ));
        }
        inner
            .parties
            .entry(party.contract_id)
            .or_default()
            .push(party.clone());
        Ok(())
    }

    async fn delete_party(&self, contract_id: &ContractId, party_id: &PartyId) -> Result<()> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(contract_id)?;
        if !stored.status.parties_editable() {
            return Err(StoreError::status_conflict(
                &[ContractStatus::Draft],
                stored.status,
            ));
        }
        let parties = inner.parties.entry(*contract_id).or_default();
        let before = parties.len();
        parties.retain(|p| &p.id != party_id);
        if parties.len() == before {
            return Err(StoreError::PartyNotFound(party_id.to_string()));
        }
        Ok(())
    }

    async fn sign_party(
        &self,
        contract_id: &ContractId,
        party_id: &PartyId,
        expected_file: Option<&ContentHash>,
        event: &SignatureEvent,
    ) -> Result<SignOutcome> {
        let mut inner = self.write()?;
        let stored = inner.live_mut(contract_id)?;
        if stored.status != ContractStatus::PendingSignature {
            return Err(StoreError::status_conflict(
                &[ContractStatus::PendingSignature],
                stored.status,
            ));
        }
        if let Some(expected) = expected_file {
            if stored.file.as_ref().map(|f| &f.hash) != Some(expected) {
                return Err(StoreError::FileChanged(format!("contract {}", contract_id)));
            }
        }

        let parties = inner.parties.entry(*contract_id).or_default();
        let party = parties
            .iter_mut()
            .find(|p| &p.id == party_id)
            .ok_or_else(|| StoreError::PartyNotFound(party_id.to_string()))?;
        if party.has_signed() {
            return Err(StoreError::PartyAlreadySigned(party_id.to_string()));
        }
        party.mark_signed(event.timestamp);
        let party = party.clone();
        let remaining = parties.iter().filter(|p| !p.has_signed()).count();

        inner
            .events
            .entry(*contract_id)
            .or_default()
            .push(event.clone());

        let contract_signed = remaining == 0;
        if contract_signed {
            let stored = inner.live_mut(contract_id)?;
            stored.status = ContractStatus::Signed;
            stored.updated_at = event.timestamp;
        }

        Ok(SignOutcome {
            party,
            event: event.clone(),
            contract_signed,
        })
    }
}

/// In-memory blob store with failure injection for tests.
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, BlobObject>>,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            fail_puts: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make `put` fail until reset.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make `delete` fail until reset.
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Check if an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(path))
            .unwrap_or(false)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        if self.fail_puts.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Blob("injected put failure".into()));
        }
        let mut objects = self
            .objects
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        objects.insert(
            path.to_string(),
            BlobObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<BlobObject>> {
        let objects = self
            .objects
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        Ok(objects.get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        if self.fail_deletes.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Blob("injected delete failure".into()));
        }
        let mut objects = self
            .objects
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))?;
        objects.remove(path);
        Ok(())
    }
}
