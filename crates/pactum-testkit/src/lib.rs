//! # Pactum Testkit
//!
//! Testing utilities for the Pactum engine.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: A seeded firm with an owner and one member per capability,
//!   wired to an in-memory engine
//! - **Generators**: Proptest strategies for statuses, contract and party
//!   input, and file payloads
//! - **Signers**: Parties holding an Ed25519 key that produce attestations
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use pactum_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fx = TestFixture::new().await;
//!     let contract = fx.draft("NDA").await;
//!     let record = fx.engine.get_contract(&fx.owner, &contract.id).await.unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use pactum_testkit::generators::new_party;
//!
//! proptest! {
//!     #[test]
//!     fn generated_parties_validate(input in new_party()) {
//!         prop_assert!(pactum_core::validation::validate_new_party(&input).is_ok());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{init_tracing, test_config, MemoryEngine, Signer, TestFixture};
