//! Integration test: reveal material stored by the registry client binds
//! to the commitment a verifier reconstructs.

use std::time::Duration;

use alloy::primitives::Address;
use bridge_core::{Salt, SettlementId, SettlementRecord};
use bridge_crypto::{derive_commitment, new_commitment_at};
use bridge_settlement::{HttpSaltRegistry, RegistryError, SaltRegistry};
use escrow_bridge_integration_tests::FakeServices;

fn sender() -> Address {
    "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap()
}

#[tokio::test]
async fn test_stored_record_recomputes_commitment() {
    let services = FakeServices::spawn(201, vec![]).await;
    let registry = HttpSaltRegistry::new(&services.base_url, Duration::from_secs(5)).unwrap();

    let commitment = new_commitment_at(sender(), "bob@example.com", 1_700_000_000_123).unwrap();
    let record = SettlementRecord::new(&commitment, "bob@example.com", "payee@example.com");
    registry.store_salt(&record).await.expect("stored");

    let stored = services.state.stored();
    assert_eq!(stored.len(), 1);
    let body = &stored[0];

    // Wire salt is canonical 0x-prefixed lowercase hex.
    let salt_text = body["salt"].as_str().unwrap();
    assert_eq!(salt_text.len(), 66);
    assert_eq!(salt_text, commitment.salt.to_hex());

    let salt: Salt = salt_text.parse().unwrap();
    let settlement_id = SettlementId::new(sender(), 1_700_000_000_123);
    assert_eq!(
        settlement_id.as_str(),
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266-1700000000123"
    );
    let (id_hash, email_hash) = derive_commitment(&salt, &settlement_id, "bob@example.com");
    assert_eq!(id_hash, commitment.id_hash);
    assert_eq!(email_hash, commitment.email_hash);
    assert_eq!(body["id_hash"], id_hash.to_string());
}

#[tokio::test]
async fn test_same_inputs_give_unlinkable_commitments() {
    let services = FakeServices::spawn(200, vec![]).await;
    let registry = HttpSaltRegistry::new(&services.base_url, Duration::from_secs(5)).unwrap();

    let first = new_commitment_at(sender(), "bob@example.com", 42).unwrap();
    let second = new_commitment_at(sender(), "bob@example.com", 42).unwrap();
    assert_ne!(first.id_hash, second.id_hash);
    assert_ne!(first.email_hash, second.email_hash);

    for commitment in [&first, &second] {
        let record = SettlementRecord::new(commitment, "bob@example.com", "payee@example.com");
        registry.store_salt(&record).await.unwrap();
    }

    let stored = services.state.stored();
    assert_eq!(stored.len(), 2);
    assert_ne!(stored[0]["salt"], stored[1]["salt"]);
}

#[tokio::test]
async fn test_rejection_carries_status_and_body() {
    let services = FakeServices::spawn(422, vec![]).await;
    let registry = HttpSaltRegistry::new(&services.base_url, Duration::from_secs(5)).unwrap();

    let commitment = new_commitment_at(sender(), "bob@example.com", 1).unwrap();
    let record = SettlementRecord::new(&commitment, "bob@example.com", "payee@example.com");

    match registry.store_salt(&record).await {
        Err(RegistryError::Rejected { status, body }) => {
            assert_eq!(status, 422);
            assert!(body.contains("registry unavailable"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert!(services.state.stored().is_empty());
    assert_eq!(services.state.registry_hits(), 1);
}
