//! Integration test: full settlement attempts across crates.
//!
//! Drives the orchestrator with the real HTTP registry and status clients
//! against a local fake service, and an in-memory escrow contract.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use bridge_core::{AttemptPhase, Salt, SettlementStatus};
use bridge_crypto::salted_hash;
use bridge_settlement::adapters::{CallEvent, CallLog, MemoryEscrow};
use bridge_settlement::{
    CancelToken, HttpSaltRegistry, HttpStatusFeed, OrchestratorConfig, PaymentIntent, PollConfig,
    RetryAdvice, SettlementError, SettlementOrchestrator,
};
use escrow_bridge_integration_tests::FakeServices;
use serde_json::json;

fn sender() -> Address {
    "0xf11692c3ad99c121923288630f7e21e1d57b3689".parse().unwrap()
}

fn usdc(whole: u64) -> U256 {
    U256::from(whole) * U256::from(1_000_000u64)
}

fn config(max_attempts: u32, strict: bool) -> OrchestratorConfig {
    OrchestratorConfig {
        amount_decimals: 6,
        confirmations: 1,
        confirmation_timeout: Duration::from_secs(5),
        polling: PollConfig {
            interval: Duration::from_millis(5),
            max_attempts,
            strict,
        },
    }
}

fn intent(amount: &str) -> PaymentIntent {
    PaymentIntent {
        email: "alice@example.com".into(),
        amount: amount.into(),
        recipient_override: None,
    }
}

/// Build an orchestrator wired to `services` and a funded in-memory escrow.
fn orchestrator(
    services: &FakeServices,
    chain: Arc<MemoryEscrow>,
    config: OrchestratorConfig,
) -> SettlementOrchestrator {
    let timeout = Duration::from_secs(5);
    let registry = HttpSaltRegistry::new(&services.base_url, timeout).expect("registry client");
    let feed = HttpStatusFeed::new(&services.base_url, timeout).expect("status client");
    SettlementOrchestrator::new(chain, Arc::new(registry), Arc::new(feed), config)
}

// =========================================================================
// Happy path
// =========================================================================

#[tokio::test]
async fn test_full_settlement_over_http() {
    let services = FakeServices::spawn(
        200,
        vec![
            (200, json!({"status": "pending"})),
            (200, json!({"status": "pending"})),
            (200, json!({"status": "completed"})),
        ],
    )
    .await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(100)));
    let orchestrator = orchestrator(&services, chain.clone(), config(10, false));

    let outcome = orchestrator
        .execute(&intent("12.34"), &CancelToken::never())
        .await
        .expect("settlement should complete");

    assert_eq!(outcome.status, SettlementStatus::Completed);
    assert_eq!(outcome.message(), "Settlement completed");
    assert_eq!(orchestrator.phase(&outcome.id_hash), Some(AttemptPhase::Settled));

    // The status service was asked about exactly this escrow, three times.
    let requests = services.state.status_requests();
    assert_eq!(requests.len(), 3);
    for request in &requests {
        assert_eq!(request["escrowId"], outcome.id_hash.to_string());
    }

    // On-chain amount is exact minor units.
    let escrow = chain.escrow(&outcome.id_hash).expect("escrow opened");
    assert_eq!(escrow.amount, U256::from(12_340_000u64));
}

#[tokio::test]
async fn test_registered_salt_reveals_on_chain_hashes() {
    let services = FakeServices::spawn(200, vec![(200, json!({"status": "completed"}))]).await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(10)));
    let orchestrator = orchestrator(&services, chain.clone(), config(3, false));

    let outcome = orchestrator
        .execute(&intent("1"), &CancelToken::never())
        .await
        .expect("settlement");

    let stored = services.state.stored();
    assert_eq!(stored.len(), 1);
    let record = &stored[0];
    assert_eq!(record["id_hash"], outcome.id_hash.to_string());
    assert_eq!(record["email"], "alice@example.com");
    assert_eq!(record["recipient_email"], "recipient@example.com");

    // A verifier holding only the registry record can recompute both hashes.
    let salt: Salt = record["salt"].as_str().unwrap().parse().expect("salt hex");
    let escrow = chain.escrow(&outcome.id_hash).unwrap();
    assert_eq!(salted_hash(&salt, "alice@example.com"), escrow.email_hash);
    assert_eq!(salted_hash(&salt, outcome.settlement_id.as_str()), outcome.id_hash);
}

// =========================================================================
// Registry and balance failures
// =========================================================================

#[tokio::test]
async fn test_registry_rejection_prevents_submission() {
    let services = FakeServices::spawn(503, vec![]).await;
    let log = CallLog::new();
    let chain = Arc::new(MemoryEscrow::new(sender(), log.clone()).with_free_balance(usdc(100)));
    let orchestrator = orchestrator(&services, chain.clone(), config(3, false));

    let err = orchestrator
        .execute(&intent("5"), &CancelToken::never())
        .await
        .expect_err("registry is down");

    assert!(matches!(err, SettlementError::RegistrationFailure(_)));
    assert_eq!(err.retry_advice(), RetryAdvice::RetryAttempt);
    assert_eq!(services.state.registry_hits(), 1);
    assert_eq!(chain.escrow_count(), 0);
    assert!(!log.events().iter().any(|e| matches!(e, CallEvent::Submit { .. })));
    assert!(services.state.status_requests().is_empty());
}

#[tokio::test]
async fn test_insufficient_free_balance_is_not_submitted() {
    let services = FakeServices::spawn(200, vec![]).await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(100)));
    let orchestrator = orchestrator(&services, chain.clone(), config(3, false));

    let err = orchestrator
        .execute(&intent("100.000001"), &CancelToken::never())
        .await
        .expect_err("over free balance");

    match err {
        SettlementError::PreconditionFailure { requested, available } => {
            assert_eq!(requested, U256::from(100_000_001u64));
            assert_eq!(available, usdc(100));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(chain.escrow_count(), 0);
}

// =========================================================================
// Status service behaviour
// =========================================================================

#[tokio::test]
async fn test_not_found_and_server_errors_are_tolerated() {
    let services = FakeServices::spawn(
        200,
        vec![
            (200, json!({"error": "Settlement not found."})),
            (500, json!({"detail": "boom"})),
            (200, json!({"status": "failed"})),
        ],
    )
    .await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(10)));
    let orchestrator = orchestrator(&services, chain, config(10, false));

    let outcome = orchestrator
        .execute(&intent("1"), &CancelToken::never())
        .await
        .expect("lenient polling continues");

    assert_eq!(outcome.status, SettlementStatus::Failed);
    assert_eq!(outcome.message(), "Settlement failed");
    assert_eq!(services.state.status_requests().len(), 3);
}

#[tokio::test]
async fn test_strict_polling_fails_on_malformed_answer() {
    let services =
        FakeServices::spawn(200, vec![(200, json!({"status": "settling"}))]).await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(10)));
    let orchestrator = orchestrator(&services, chain.clone(), config(10, true));

    let err = orchestrator
        .execute(&intent("1"), &CancelToken::never())
        .await
        .expect_err("strict mode");

    assert!(matches!(err, SettlementError::MalformedResponse(_)));
    assert_eq!(err.retry_advice(), RetryAdvice::CheckStatusLater);
    // The escrow was opened before polling started.
    assert_eq!(chain.escrow_count(), 1);
    assert_eq!(services.state.status_requests().len(), 1);
}

#[tokio::test]
async fn test_polling_budget_exhaustion_is_timeout() {
    let services = FakeServices::spawn(200, vec![]).await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(10)));
    let orchestrator = orchestrator(&services, chain, config(4, false));

    let outcome = orchestrator
        .execute(&intent("1"), &CancelToken::never())
        .await
        .expect("timeout is an outcome");

    assert_eq!(outcome.status, SettlementStatus::TimedOut);
    assert_eq!(outcome.message(), "Timeout reached. Check again later.");
    assert_eq!(services.state.status_requests().len(), 4);
}

// =========================================================================
// Independent attempts
// =========================================================================

#[tokio::test]
async fn test_concurrent_attempts_use_distinct_commitments() {
    let services = FakeServices::spawn(200, vec![]).await;
    let chain = Arc::new(MemoryEscrow::new(sender(), CallLog::new()).with_free_balance(usdc(100)));
    let orchestrator = Arc::new(orchestrator(&services, chain.clone(), config(1, false)));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            orchestrator
                .execute(&intent("1"), &CancelToken::never())
                .await
                .map(|o| o.id_hash)
        }));
    }

    let mut ids: Vec<B256> = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().expect("attempt"));
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
    assert_eq!(chain.escrow_count(), 5);
    assert_eq!(services.state.stored().len(), 5);
}
