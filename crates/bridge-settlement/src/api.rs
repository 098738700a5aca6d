//! Client for the bridge read API.

use alloy::primitives::B256;
use bridge_core::SettlementStatus;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::{ApiError, StatusError};
use crate::poller::interpret_status;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Interpreted `/status/{id}` answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowStatusReport {
    pub escrow_id: String,
    /// `None` when the service reported an error or an unknown value.
    pub status: Option<SettlementStatus>,
    /// Service message, or the reason the answer was not understood.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EscrowInfo {
    #[serde(rename = "escrowId")]
    pub escrow_id: String,
    /// Contract payment record as reported by the service.
    pub payment: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeeInfo {
    /// Preformatted percentage, e.g. `"1.00%"`.
    pub fee_pct: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MaxEscrowTime {
    pub seconds: f64,
    pub minutes: f64,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebhookAck {
    #[serde(rename = "escrowId")]
    pub escrow_id: String,
    pub status: String,
}

#[derive(Serialize)]
struct WebhookRequest<'a> {
    webhook_url: &'a str,
    #[serde(rename = "escrowId")]
    escrow_id: String,
}

pub struct BridgeApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get("/health").await
    }

    pub async fn escrow_status(&self, escrow_id: B256) -> Result<EscrowStatusReport, ApiError> {
        let body: Value = self.get(&format!("/status/{escrow_id}")).await?;
        let detail_of = |v: &Value| {
            v.get("status")
                .and_then(|s| s.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        let (status, detail) = match interpret_status(&body) {
            Ok(status) => (Some(status), detail_of(&body)),
            Err(StatusError::Malformed(reason)) => (None, Some(reason)),
            Err(other) => (None, Some(other.to_string())),
        };

        Ok(EscrowStatusReport {
            escrow_id: body
                .get("escrowId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| escrow_id.to_string()),
            status,
            detail,
        })
    }

    pub async fn escrow_info(&self, escrow_id: B256) -> Result<EscrowInfo, ApiError> {
        self.get(&format!("/escrow_info/{escrow_id}")).await
    }

    pub async fn fee(&self) -> Result<FeeInfo, ApiError> {
        self.get("/fee").await
    }

    pub async fn max_escrow_time(&self) -> Result<MaxEscrowTime, ApiError> {
        self.get("/max_escrow_time").await
    }

    /// Ask the service to call `webhook_url` once the escrow completes.
    pub async fn register_webhook(
        &self,
        webhook_url: &str,
        escrow_id: B256,
    ) -> Result<WebhookAck, ApiError> {
        if webhook_url.trim().is_empty() {
            return Err(ApiError::InvalidRequest("webhook_url required".into()));
        }
        let request = WebhookRequest {
            webhook_url,
            escrow_id: escrow_id.to_string(),
        };
        let response = self
            .client
            .post(format!("{}/webhook", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "bridge api request");
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}
