use async_trait::async_trait;
use bridge_core::{Salt, SettlementRecord};
use serde::Serialize;
use std::time::Duration;

use crate::error::RegistryError;
use crate::traits::SaltRegistry;

/// Wire form of a reveal record.
#[derive(Serialize)]
struct StoreSaltRequest<'a> {
    id_hash: String,
    salt: &'a Salt,
    email: &'a str,
    recipient_email: &'a str,
}

/// Salt registry client: `POST {base}/api/store_salt`.
///
/// Any 2xx answer counts as acknowledgement. Timeouts, connection errors and
/// non-2xx answers are failures.
pub struct HttpSaltRegistry {
    client: reqwest::Client,
    url: String,
}

impl HttpSaltRegistry {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RegistryError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/api/store_salt", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SaltRegistry for HttpSaltRegistry {
    async fn store_salt(&self, record: &SettlementRecord) -> Result<(), RegistryError> {
        let body = StoreSaltRequest {
            id_hash: record.id_hash.to_string(),
            salt: &record.salt,
            email: &record.email,
            recipient_email: &record.recipient_email,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(id_hash = %record.id_hash, status = status.as_u16(), "registry rejected record");
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(id_hash = %record.id_hash, "reveal material registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Address, B256};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use bridge_core::{Commitment, SettlementId};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
        format!("http://{addr}")
    }

    fn record() -> SettlementRecord {
        let commitment = Commitment {
            salt: Salt::from_bytes([0x11; 32]),
            settlement_id: SettlementId::new(Address::ZERO, 1),
            id_hash: B256::repeat_byte(0xaa),
            email_hash: B256::repeat_byte(0xbb),
        };
        SettlementRecord::new(&commitment, "alice@example.com", "desk@example.com")
    }

    #[tokio::test]
    async fn test_store_salt_posts_reveal_material() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let router = Router::new().route(
            "/api/store_salt",
            post({
                let seen = seen.clone();
                move |Json(body): Json<Value>| {
                    let seen = seen.clone();
                    async move {
                        *seen.lock().unwrap() = Some(body);
                        Json(serde_json::json!({"ok": true}))
                    }
                }
            }),
        );
        let base = serve(router).await;
        let registry = HttpSaltRegistry::new(&base, Duration::from_secs(5)).unwrap();

        registry.store_salt(&record()).await.unwrap();

        let body = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["id_hash"], format!("0x{}", "aa".repeat(32)));
        assert_eq!(body["salt"], format!("0x{}", "11".repeat(32)));
        assert_eq!(body["email"], "alice@example.com");
        assert_eq!(body["recipient_email"], "desk@example.com");
    }

    #[tokio::test]
    async fn test_non_2xx_is_failure() {
        let router = Router::new().route(
            "/api/store_salt",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "db down") }),
        );
        let base = serve(router).await;
        let registry = HttpSaltRegistry::new(&base, Duration::from_secs(5)).unwrap();

        match registry.store_salt(&record()).await {
            Err(RegistryError::Rejected { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "db down");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_registry_is_transport_failure() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let registry = HttpSaltRegistry::new(&format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        assert!(matches!(
            registry.store_salt(&record()).await,
            Err(RegistryError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let router = Router::new().route("/api/store_salt", post(|| async { StatusCode::CREATED }));
        let base = serve(router).await;
        let registry = HttpSaltRegistry::new(&format!("{base}/"), Duration::from_secs(5)).unwrap();
        assert!(registry.store_salt(&record()).await.is_ok());
    }
}
