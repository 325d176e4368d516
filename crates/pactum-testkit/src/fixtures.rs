//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use ed25519_dalek::{Signer as _, SigningKey};

use pactum::{ContractLifecycle, EngineConfig};
use pactum_core::{
    attestation_message, ContentHash, Contract, ContractId, ContractParty, ContractPatch,
    ContractStatus, NewContract, NewParty, PartyKey, UserId,
};
use pactum_perms::{
    Capability, Directory, Firm, LawFirmRole, MasterSecret, Membership, MemoryDirectory,
    RoleFlags,
};
use pactum_store::{MemoryBlobStore, MemoryContractStore};

/// The engine over in-memory stores.
pub type MemoryEngine = ContractLifecycle<MemoryContractStore, MemoryBlobStore, MemoryDirectory>;

/// Master secret used by [`test_config`].
pub const TEST_MASTER_SECRET: &[u8] = b"pactum-testkit-master-secret";

/// Engine configuration with a fixed master secret.
pub fn test_config() -> EngineConfig {
    EngineConfig::new(
        MasterSecret::new(TEST_MASTER_SECRET.to_vec()).expect("test secret is non-empty"),
    )
}

/// Install a test-writer subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init();
}

/// A firm with an owner and one member per capability, plus an engine.
pub struct TestFixture {
    pub engine: MemoryEngine,
    pub store: Arc<MemoryContractStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub directory: Arc<MemoryDirectory>,
    pub firm: Firm,
    pub owner: UserId,
    /// Holds only `read`.
    pub reader: UserId,
    /// Holds only `write`.
    pub writer: UserId,
    /// Holds `read` and `write`.
    pub editor: UserId,
    /// Holds only `manage`.
    pub manager: UserId,
    /// Holds only `firm_admin`.
    pub admin: UserId,
}

impl TestFixture {
    /// Create a fixture with [`test_config`].
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    /// Create a fixture with a custom configuration.
    pub async fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryContractStore::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let directory = Arc::new(MemoryDirectory::new());

        let owner = UserId::generate();
        let firm = Firm::new("Fixture & Partners LLP", owner, 0);
        directory.put_firm(&firm).await.expect("put firm");

        let engine = ContractLifecycle::new(
            Arc::clone(&store),
            Arc::clone(&blobs),
            Arc::clone(&directory),
            config,
        );

        let mut fixture = Self {
            engine,
            store,
            blobs,
            directory,
            firm,
            owner,
            reader: UserId::NIL,
            writer: UserId::NIL,
            editor: UserId::NIL,
            manager: UserId::NIL,
            admin: UserId::NIL,
        };
        fixture.reader = fixture.member(RoleFlags::of(&[Capability::Read])).await;
        fixture.writer = fixture.member(RoleFlags::of(&[Capability::Write])).await;
        fixture.editor = fixture
            .member(RoleFlags::of(&[Capability::Read, Capability::Write]))
            .await;
        fixture.manager = fixture.member(RoleFlags::of(&[Capability::Manage])).await;
        fixture.admin = fixture.member(RoleFlags::of(&[Capability::FirmAdmin])).await;
        fixture
    }

    /// Add a new member holding a fresh role with `flags`.
    pub async fn member(&self, flags: RoleFlags) -> UserId {
        let user = UserId::generate();
        let role = LawFirmRole::new(self.firm.id, "fixture role", flags, 0);
        self.directory.put_role(&role).await.expect("put role");
        self.directory
            .put_membership(&Membership::new(self.firm.id, user, role.id, 0))
            .await
            .expect("put membership");
        user
    }

    /// Create a draft contract as the owner.
    pub async fn draft(&self, title: &str) -> Contract {
        self.engine
            .create_contract(&self.owner, &self.firm.id, NewContract::titled(title))
            .await
            .expect("create contract")
    }

    /// Add a party linked to a fresh user.
    pub async fn add_party(&self, contract_id: &ContractId, name: &str) -> (UserId, ContractParty) {
        let user = UserId::generate();
        let party = self
            .engine
            .add_contract_party(&self.owner, contract_id, NewParty::named(name).user(user))
            .await
            .expect("add party");
        (user, party)
    }

    /// Create a draft with `count` parties, each linked to its own user.
    pub async fn draft_with_parties(
        &self,
        title: &str,
        count: usize,
    ) -> (Contract, Vec<(UserId, ContractParty)>) {
        let contract = self.draft(title).await;
        let mut parties = Vec::with_capacity(count);
        for i in 0..count {
            parties.push(self.add_party(&contract.id, &format!("Party {}", i + 1)).await);
        }
        (contract, parties)
    }

    /// Move a draft to `pending_signature` as the owner.
    pub async fn open_for_signing(&self, contract_id: &ContractId) -> Contract {
        self.engine
            .update_contract(
                &self.owner,
                contract_id,
                ContractPatch::default().status(ContractStatus::PendingSignature),
            )
            .await
            .expect("open for signing")
    }
}

/// A user holding an Ed25519 key for signature attestations.
pub struct Signer {
    pub user: UserId,
    key: SigningKey,
}

impl Signer {
    /// Create a signer with a random key.
    pub fn random() -> Self {
        Self::from_seed(rand::random())
    }

    /// Create a signer with a deterministic key.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            user: UserId::generate(),
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// The public key to register on the party.
    pub fn party_key(&self) -> PartyKey {
        PartyKey::from_bytes(self.key.verifying_key().to_bytes())
    }

    /// A party input linked to this signer's user and key.
    pub fn party(&self, name: &str) -> NewParty {
        NewParty::named(name)
            .user(self.user)
            .verifying_key(self.party_key())
    }

    /// Hex attestation over a contract's file hash.
    pub fn attest(&self, contract_id: &ContractId, file_hash: &ContentHash) -> String {
        let message = attestation_message(contract_id, file_hash);
        hex::encode(self.key.sign(&message).to_bytes())
    }
}
