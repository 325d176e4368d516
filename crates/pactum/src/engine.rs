//! The contract lifecycle engine.
//!
//! Composes the permission evaluator, the per-contract encryption service,
//! a [`ContractStore`], and a [`BlobStore`] into the operations callers use.

use std::sync::Arc;

use bytes::Bytes;
use pactum_core::validation::{
    validate_expiry, validate_file_name, validate_file_size, validate_new_contract,
    validate_new_party, validate_title,
};
use pactum_core::{
    now_millis, ContentHash, Contract, ContractId, ContractParty, ContractPatch, ContractRecord,
    ContractStatus, FileRef, FirmId, NewContract, NewParty, PartyId, SignatureEvent,
    SignatureRequest, UserId, ValidationError,
};
use pactum_perms::{Capability, ContentEncryptionService, Directory, PermissionEvaluator, RoleCache};
use pactum_store::{BlobObject, BlobStore, ContractStore, ListFilter, SignOutcome, StoreError};

use crate::config::EngineConfig;
use crate::error::{LifecycleError, Result};
use crate::firm::FirmAdmin;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A decrypted contract file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractFile {
    pub data: Bytes,
    pub file_name: String,
    pub content_type: String,
    /// SHA-256 of `data`.
    pub hash: ContentHash,
}

/// The contract lifecycle engine.
///
/// Provides:
/// - Contract creation, reads, listing, updates, and soft deletion
/// - Encrypted file upload and download
/// - Party management while a contract is a draft
/// - Signature collection with exactly-once completion
pub struct ContractLifecycle<S, B, D>
where
    S: ContractStore,
    B: BlobStore,
    D: Directory,
{
    store: Arc<S>,
    blobs: Arc<B>,
    permissions: PermissionEvaluator<D>,
    crypto: ContentEncryptionService,
    config: EngineConfig,
}

impl<S, B, D> ContractLifecycle<S, B, D>
where
    S: ContractStore,
    B: BlobStore,
    D: Directory,
{
    /// Create an engine. The role cache lives as long as the engine.
    pub fn new(store: Arc<S>, blobs: Arc<B>, directory: Arc<D>, config: EngineConfig) -> Self {
        let cache = Arc::new(RoleCache::new(config.role_cache_ttl));
        Self {
            store,
            blobs,
            permissions: PermissionEvaluator::new(directory, cache),
            crypto: ContentEncryptionService::new(config.master_secret.clone()),
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<B> {
        &self.blobs
    }

    pub fn permissions(&self) -> &PermissionEvaluator<D> {
        &self.permissions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Firm administration sharing this engine's directory and role cache,
    /// so role and membership changes are visible to the next check.
    pub fn firm_admin(&self) -> FirmAdmin<D> {
        FirmAdmin::new(
            Arc::clone(self.permissions.directory()),
            Arc::clone(self.permissions.cache()),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Contracts
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a draft contract in a firm.
    pub async fn create_contract(
        &self,
        actor: &UserId,
        firm_id: &FirmId,
        input: NewContract,
    ) -> Result<Contract> {
        self.require(actor, firm_id, Capability::Write).await?;

        let now = now_millis();
        validate_new_contract(&input, now)?;

        let contract = Contract::new(input, *firm_id, *actor, now);
        self.store.insert_contract(&contract).await?;

        tracing::info!(
            contract_id = %contract.id,
            firm_id = %firm_id,
            actor = %actor,
            "contract created"
        );
        Ok(contract)
    }

    /// Get a contract with its parties and audit trail.
    ///
    /// Firm readers, the owner, and listed parties may view a contract.
    pub async fn get_contract(&self, actor: &UserId, id: &ContractId) -> Result<ContractRecord> {
        let record = self.load(id).await?;
        self.require_view(actor, &record).await?;
        Ok(record)
    }

    /// List a firm's live contracts.
    pub async fn list_contracts(
        &self,
        actor: &UserId,
        firm_id: &FirmId,
        filter: &ListFilter,
    ) -> Result<Vec<Contract>> {
        self.require(actor, firm_id, Capability::Read).await?;
        Ok(self.store.list_contracts(firm_id, filter).await?)
    }

    /// Apply a partial update.
    ///
    /// A status change must follow the transition table; if it does not,
    /// nothing in the patch is applied. A contract without parties cannot
    /// be sent out for signing.
    pub async fn update_contract(
        &self,
        actor: &UserId,
        id: &ContractId,
        patch: ContractPatch,
    ) -> Result<Contract> {
        let record = self.load(id).await?;
        let current = &record.contract;
        self.require(actor, &current.firm_id, Capability::Write).await?;

        if let Some(title) = patch.title.as_deref().filter(|t| !t.is_empty()) {
            validate_title(title)?;
        }
        if let Some(at) = patch.expires_at {
            validate_expiry(at, current.created_at)?;
        }
        if patch.is_empty() {
            return Ok(current.clone());
        }

        let expected = current.status;
        let mut updated = current.clone();
        let previous = patch.apply(&mut updated, now_millis())?;
        let target = patch.status.unwrap_or(expected);
        if previous.is_some()
            && target == ContractStatus::PendingSignature
            && record.parties.is_empty()
        {
            return Err(ValidationError::NoParties.into());
        }

        if is_status_only(&patch) {
            self.store
                .transition_status(id, expected, target, updated.updated_at)
                .await
                .map_err(conflict(target))?;
        } else {
            self.store
                .update_contract(&updated, expected)
                .await
                .map_err(conflict(target))?;
        }

        if let Some(from) = previous {
            tracing::info!(
                contract_id = %id,
                actor = %actor,
                from = %from,
                to = %updated.status,
                "contract status changed"
            );
        }
        Ok(updated)
    }

    /// Soft-delete a draft or void contract.
    pub async fn soft_delete_contract(&self, actor: &UserId, id: &ContractId) -> Result<()> {
        let record = self.load(id).await?;
        let contract = &record.contract;
        self.require(actor, &contract.firm_id, Capability::Manage).await?;

        if !contract.status.is_deletable() {
            return Err(LifecycleError::InvalidStatusTransition {
                from: contract.status,
                to: ContractStatus::Void,
            });
        }

        self.store
            .soft_delete_contract(
                id,
                &[ContractStatus::Draft, ContractStatus::Void],
                now_millis(),
            )
            .await
            .map_err(conflict(ContractStatus::Void))?;

        tracing::info!(contract_id = %id, actor = %actor, "contract deleted");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt and store a new document version.
    ///
    /// Recording the file resets every party's signature and forces the
    /// contract back to `draft`. If the record cannot be written, the
    /// uploaded blob is removed again, or the object it replaced is put back.
    pub async fn upload_contract_file(
        &self,
        actor: &UserId,
        id: &ContractId,
        data: &[u8],
        file_name: &str,
        content_type: &str,
    ) -> Result<FileRef> {
        let record = self.load(id).await?;
        let contract = &record.contract;
        self.require(actor, &contract.firm_id, Capability::Write).await?;

        validate_file_name(file_name)?;
        validate_file_size(data.len(), self.config.max_file_size)?;

        let content_type = if content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            content_type
        };

        let hash = ContentHash::hash(data);
        let sealed = self.crypto.seal(id, data)?;

        let path = FileRef::blob_path(id, file_name);
        // Replacing the live object in place; keep it to put back if the
        // record write fails.
        let previous = match contract.file.as_ref().filter(|f| f.path == path) {
            Some(_) => self
                .blobs
                .get(&path)
                .await
                .map_err(|e| LifecycleError::EncryptionFailed(e.to_string()))?,
            None => None,
        };
        self.blobs
            .put(&path, Bytes::from(sealed), content_type)
            .await
            .map_err(|e| LifecycleError::EncryptionFailed(e.to_string()))?;

        let file = FileRef {
            url: format!(
                "{}/{}/file",
                self.config.file_url_prefix.trim_end_matches('/'),
                id
            ),
            path,
            hash,
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            size: data.len() as u64,
        };

        if let Err(e) = self.store.record_file(id, &file, now_millis()).await {
            self.undo_blob_write(id, &file.path, previous).await;
            return Err(LifecycleError::StorageFailure(e.to_string()));
        }

        tracing::info!(
            contract_id = %id,
            actor = %actor,
            file_name,
            size = file.size,
            previous_status = %contract.status,
            "contract file uploaded, signatures reset"
        );
        Ok(file)
    }

    /// Fetch and decrypt a contract file.
    ///
    /// Without a file name, the contract's current file is returned. The
    /// current file's plaintext must match its recorded hash.
    pub async fn get_contract_file(
        &self,
        actor: &UserId,
        id: &ContractId,
        file_name: Option<&str>,
    ) -> Result<ContractFile> {
        let record = self.load(id).await?;
        self.require_view(actor, &record).await?;

        let current = record.contract.file.as_ref();
        let file_name = match file_name {
            Some(name) => name.to_string(),
            None => current
                .and_then(|f| FileRef::file_name_from_path(&f.path))
                .ok_or(ValidationError::MissingFile)?
                .to_string(),
        };
        validate_file_name(&file_name)?;

        let path = FileRef::blob_path(id, &file_name);
        let object = self
            .blobs
            .get(&path)
            .await
            .map_err(|e| LifecycleError::DecryptionFailed(e.to_string()))?
            .ok_or_else(|| LifecycleError::NotFound(format!("file {}", path)))?;

        let plaintext = self
            .crypto
            .open(id, &object.data)
            .map_err(|e| LifecycleError::DecryptionFailed(e.to_string()))?;
        let hash = ContentHash::hash(&plaintext);

        if let Some(file) = current.filter(|f| f.path == path) {
            if file.hash != hash {
                return Err(LifecycleError::DecryptionFailed(format!(
                    "content hash mismatch for {}",
                    path
                )));
            }
        }

        Ok(ContractFile {
            data: Bytes::from(plaintext),
            file_name,
            content_type: object.content_type,
            hash,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parties
    // ─────────────────────────────────────────────────────────────────────────

    /// Add a party to a draft contract.
    pub async fn add_contract_party(
        &self,
        actor: &UserId,
        id: &ContractId,
        input: NewParty,
    ) -> Result<ContractParty> {
        let record = self.load(id).await?;
        let contract = &record.contract;
        self.require(actor, &contract.firm_id, Capability::Write).await?;
        require_draft(contract.status)?;

        validate_new_party(&input)?;

        let party = ContractParty::new(*id, input, now_millis());
        self.store
            .insert_party(&party)
            .await
            .map_err(conflict(ContractStatus::Draft))?;

        tracing::debug!(contract_id = %id, party_id = %party.id, "party added");
        Ok(party)
    }

    /// Remove a party from a draft contract.
    pub async fn remove_contract_party(
        &self,
        actor: &UserId,
        id: &ContractId,
        party_id: &PartyId,
    ) -> Result<()> {
        let record = self.load(id).await?;
        let contract = &record.contract;
        self.require(actor, &contract.firm_id, Capability::Write).await?;
        require_draft(contract.status)?;

        if record.party(party_id).is_none() {
            return Err(LifecycleError::NotFound(format!("party {}", party_id)));
        }

        self.store
            .delete_party(id, party_id)
            .await
            .map_err(conflict(ContractStatus::Draft))?;

        tracing::debug!(contract_id = %id, party_id = %party_id, "party removed");
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Signing
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign a contract as one of its parties.
    ///
    /// The party is `party_id` when given, otherwise the actor's own unsigned
    /// party. Marking the party, appending the audit event, and completing the
    /// contract happen in one store transaction; exactly one concurrent
    /// signer sees `contract_signed`.
    pub async fn sign_contract(
        &self,
        actor: &UserId,
        id: &ContractId,
        party_id: Option<&PartyId>,
        request: SignatureRequest,
    ) -> Result<SignOutcome> {
        let record = self.load(id).await?;
        let contract = &record.contract;

        if contract.status != ContractStatus::PendingSignature {
            return Err(LifecycleError::InvalidStatusTransition {
                from: contract.status,
                to: ContractStatus::Signed,
            });
        }

        let party = match party_id {
            Some(pid) => {
                let party = record
                    .party(pid)
                    .ok_or_else(|| LifecycleError::NotFound(format!("party {}", pid)))?;
                if party.user_id.as_ref() != Some(actor) {
                    return Err(LifecycleError::Forbidden(format!(
                        "{} is not party {}",
                        actor, pid
                    )));
                }
                party
            }
            None => {
                let own: Vec<&ContractParty> = record
                    .parties
                    .iter()
                    .filter(|p| p.user_id.as_ref() == Some(actor))
                    .collect();
                own.iter()
                    .copied()
                    .find(|p| !p.has_signed())
                    .or_else(|| own.first().copied())
                    .ok_or_else(|| {
                        LifecycleError::Forbidden(format!("{} is not a party to {}", actor, id))
                    })?
            }
        };

        if party.has_signed() {
            return Err(LifecycleError::AlreadySigned(party.id.to_string()));
        }
        if request.signature.trim().is_empty() {
            return Err(ValidationError::EmptySignature.into());
        }
        // The attested hash is re-checked inside the signing transaction.
        let attested = match &party.verifying_key {
            Some(key) => {
                let file = contract.file.as_ref().ok_or(ValidationError::MissingFile)?;
                key.verify_attestation(id, &file.hash, &request.signature)?;
                Some(file.hash)
            }
            None => None,
        };

        let event = SignatureEvent::signed(*id, party.id, *actor, request, now_millis());
        let outcome = self
            .store
            .sign_party(id, &party.id, attested.as_ref(), &event)
            .await
            .map_err(conflict(ContractStatus::Signed))?;

        tracing::info!(
            contract_id = %id,
            party_id = %party.id,
            actor = %actor,
            "party signed"
        );
        if outcome.contract_signed {
            tracing::info!(contract_id = %id, "all parties signed, contract signed");
        }
        Ok(outcome)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Put back the object a failed upload replaced, or remove the orphan.
    async fn undo_blob_write(&self, id: &ContractId, path: &str, previous: Option<BlobObject>) {
        let (result, action) = match previous {
            Some(object) => (
                self.blobs
                    .put(path, object.data, &object.content_type)
                    .await,
                "restore replaced blob",
            ),
            None => (self.blobs.delete(path).await, "remove orphaned blob"),
        };
        if let Err(e) = result {
            tracing::warn!(
                contract_id = %id,
                path,
                error = %e,
                "failed to {}",
                action
            );
        }
    }

    async fn load(&self, id: &ContractId) -> Result<ContractRecord> {
        self.store
            .get_contract(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound(format!("contract {}", id)))
    }

    async fn require(&self, actor: &UserId, firm_id: &FirmId, capability: Capability) -> Result<()> {
        if self
            .permissions
            .has_permission(actor, firm_id, capability)
            .await?
        {
            Ok(())
        } else {
            Err(LifecycleError::Forbidden(format!(
                "{} lacks {} on firm {}",
                actor, capability, firm_id
            )))
        }
    }

    async fn require_view(&self, actor: &UserId, record: &ContractRecord) -> Result<()> {
        if record.is_party(actor) {
            return Ok(());
        }
        self.require(actor, &record.contract.firm_id, Capability::Read)
            .await
    }
}

fn is_status_only(patch: &ContractPatch) -> bool {
    patch.status.is_some()
        && ContractPatch {
            status: None,
            ..patch.clone()
        }
        .is_empty()
}

fn require_draft(status: ContractStatus) -> Result<()> {
    if status.parties_editable() {
        Ok(())
    } else {
        Err(LifecycleError::InvalidStatusTransition {
            from: status,
            to: ContractStatus::Draft,
        })
    }
}

/// Classify a store error, reporting a lost status race as a failed move to `target`.
fn conflict(target: ContractStatus) -> impl FnOnce(StoreError) -> LifecycleError {
    move |e| match e {
        StoreError::StatusConflict { actual, .. } => LifecycleError::InvalidStatusTransition {
            from: actual,
            to: target,
        },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_perms::{Firm, LawFirmRole, MasterSecret, MemoryDirectory, Membership, RoleFlags};
    use pactum_store::{MemoryBlobStore, MemoryContractStore};

    type Engine = ContractLifecycle<MemoryContractStore, MemoryBlobStore, MemoryDirectory>;

    struct Setup {
        engine: Engine,
        directory: Arc<MemoryDirectory>,
        firm: FirmId,
        owner: UserId,
    }

    async fn setup() -> Setup {
        let directory = Arc::new(MemoryDirectory::new());
        let owner = UserId::generate();
        let firm = Firm::new("Acme LLP", owner, 0);
        directory.put_firm(&firm).await.unwrap();

        let config = EngineConfig::new(MasterSecret::new(b"unit-test-secret".to_vec()).unwrap());
        let engine = ContractLifecycle::new(
            Arc::new(MemoryContractStore::new()),
            Arc::new(MemoryBlobStore::new()),
            Arc::clone(&directory),
            config,
        );
        Setup {
            engine,
            directory,
            firm: firm.id,
            owner,
        }
    }

    async fn member(setup: &Setup, flags: RoleFlags) -> UserId {
        let user = UserId::generate();
        let role = LawFirmRole::new(setup.firm, "role", flags, 0);
        setup.directory.put_role(&role).await.unwrap();
        setup
            .directory
            .put_membership(&Membership::new(setup.firm, user, role.id, 0))
            .await
            .unwrap();
        user
    }

    #[tokio::test]
    async fn test_create_starts_as_draft() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        assert_eq!(contract.status, ContractStatus::Draft);
        assert_eq!(contract.creator_id, s.owner);

        let record = s.engine.get_contract(&s.owner, &contract.id).await.unwrap();
        assert_eq!(record.contract, contract);
    }

    #[tokio::test]
    async fn test_create_requires_write() {
        let s = setup().await;
        let reader = member(&s, RoleFlags::of(&[Capability::Read])).await;
        let err = s
            .engine
            .create_contract(&reader, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let s = setup().await;
        let err = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("   "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::Required { field: "title" })
        ));
    }

    #[tokio::test]
    async fn test_invalid_transition_applies_nothing() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        let err = s
            .engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default()
                    .title("Renamed")
                    .status(ContractStatus::Signed),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidStatusTransition {
                from: ContractStatus::Draft,
                to: ContractStatus::Signed
            }
        ));

        let record = s.engine.get_contract(&s.owner, &contract.id).await.unwrap();
        assert_eq!(record.contract.title, "NDA");
        assert_eq!(record.contract.status, ContractStatus::Draft);
    }

    #[tokio::test]
    async fn test_empty_fields_are_ignored() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(
                &s.owner,
                &s.firm,
                NewContract::titled("NDA").description("mutual"),
            )
            .await
            .unwrap();

        let updated = s
            .engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default().title("").content("Terms"),
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "NDA");
        assert_eq!(updated.description, "mutual");
        assert_eq!(updated.content, "Terms");
    }

    #[tokio::test]
    async fn test_expiry_before_creation_rejected() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        let err = s
            .engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default().expires_at(contract.created_at - 1),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::ExpiryBeforeCreation { .. })
        ));
    }

    #[tokio::test]
    async fn test_party_can_view_without_read() {
        let s = setup().await;
        let signer = UserId::generate();
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        assert!(matches!(
            s.engine.get_contract(&signer, &contract.id).await,
            Err(LifecycleError::Forbidden(_))
        ));

        s.engine
            .add_contract_party(&s.owner, &contract.id, NewParty::named("Sam").user(signer))
            .await
            .unwrap();
        assert!(s.engine.get_contract(&signer, &contract.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_soft_delete_requires_manage_and_hides() {
        let s = setup().await;
        let writer = member(&s, RoleFlags::of(&[Capability::Read, Capability::Write])).await;
        let contract = s
            .engine
            .create_contract(&writer, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        assert!(matches!(
            s.engine.soft_delete_contract(&writer, &contract.id).await,
            Err(LifecycleError::Forbidden(_))
        ));

        s.engine
            .soft_delete_contract(&s.owner, &contract.id)
            .await
            .unwrap();
        assert!(matches!(
            s.engine.get_contract(&s.owner, &contract.id).await,
            Err(LifecycleError::NotFound(_))
        ));
        assert!(s
            .engine
            .list_contracts(&s.owner, &s.firm, &ListFilter::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_partyless_contract_cannot_be_sent() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        let err = s
            .engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default()
                    .title("Renamed")
                    .status(ContractStatus::PendingSignature),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::NoParties)
        ));

        let record = s.engine.get_contract(&s.owner, &contract.id).await.unwrap();
        assert_eq!(record.contract.status, ContractStatus::Draft);
        assert_eq!(record.contract.title, "NDA");
    }

    #[tokio::test]
    async fn test_pending_contract_cannot_be_deleted() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        s.engine
            .add_contract_party(&s.owner, &contract.id, NewParty::named("Ann"))
            .await
            .unwrap();
        s.engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default().status(ContractStatus::PendingSignature),
            )
            .await
            .unwrap();

        let err = s
            .engine
            .soft_delete_contract(&s.owner, &contract.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::InvalidStatusTransition {
                from: ContractStatus::PendingSignature,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        let file = s
            .engine
            .upload_contract_file(&s.owner, &contract.id, b"%PDF-1.7", "nda.pdf", "application/pdf")
            .await
            .unwrap();
        assert_eq!(file.path, format!("contracts/{}/nda.pdf", contract.id));
        assert_eq!(file.url, format!("/api/contracts/{}/file", contract.id));
        assert_eq!(file.hash, ContentHash::hash(b"%PDF-1.7"));

        let stored = s.engine.blobs().get(&file.path).await.unwrap().unwrap();
        assert_ne!(stored.data.as_ref(), b"%PDF-1.7");

        let fetched = s
            .engine
            .get_contract_file(&s.owner, &contract.id, None)
            .await
            .unwrap();
        assert_eq!(fetched.data.as_ref(), b"%PDF-1.7");
        assert_eq!(fetched.file_name, "nda.pdf");
        assert_eq!(fetched.content_type, "application/pdf");
    }

    #[tokio::test]
    async fn test_download_without_file() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        let err = s
            .engine
            .get_contract_file(&s.owner, &contract.id, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::MissingFile)
        ));
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_file() {
        let s = setup().await;
        let engine = ContractLifecycle::new(
            Arc::clone(s.engine.store()),
            Arc::clone(s.engine.blobs()),
            Arc::clone(&s.directory),
            s.engine.config().clone().with_max_file_size(4),
        );
        let contract = engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();

        let err = engine
            .upload_contract_file(&s.owner, &contract.id, b"12345", "a.txt", "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::FileTooLarge { size: 5, max: 4 })
        ));
        assert!(engine.blobs().is_empty());
    }

    #[tokio::test]
    async fn test_sign_by_non_party_is_forbidden() {
        let s = setup().await;
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        s.engine
            .add_contract_party(
                &s.owner,
                &contract.id,
                NewParty::named("Ann").user(UserId::generate()),
            )
            .await
            .unwrap();
        s.engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default().status(ContractStatus::PendingSignature),
            )
            .await
            .unwrap();

        let err = s
            .engine
            .sign_contract(&s.owner, &contract.id, None, SignatureRequest::new("sig"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_sign_rejects_empty_payload() {
        let s = setup().await;
        let signer = UserId::generate();
        let contract = s
            .engine
            .create_contract(&s.owner, &s.firm, NewContract::titled("NDA"))
            .await
            .unwrap();
        s.engine
            .add_contract_party(&s.owner, &contract.id, NewParty::named("Ann").user(signer))
            .await
            .unwrap();
        s.engine
            .update_contract(
                &s.owner,
                &contract.id,
                ContractPatch::default().status(ContractStatus::PendingSignature),
            )
            .await
            .unwrap();

        let err = s
            .engine
            .sign_contract(&signer, &contract.id, None, SignatureRequest::new("  "))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::ValidationFailed(ValidationError::EmptySignature)
        ));
    }

    #[test]
    fn test_status_only_patch() {
        assert!(is_status_only(
            &ContractPatch::default().status(ContractStatus::Void)
        ));
        assert!(is_status_only(
            &ContractPatch::default()
                .status(ContractStatus::Void)
                .title("")
        ));
        assert!(!is_status_only(
            &ContractPatch::default()
                .status(ContractStatus::Void)
                .title("X")
        ));
        assert!(!is_status_only(&ContractPatch::default().title("X")));
    }
}
