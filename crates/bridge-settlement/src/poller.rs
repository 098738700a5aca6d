//! Settlement status polling.
//!
//! [`StatusPoller`] asks a [`StatusFeed`] for the escrow's status at a fixed
//! interval until a terminal status is reported or the attempt budget runs
//! out. The step logic is a pure state machine ([`PollState::step`]); the
//! async driver only adds I/O, sleeping and cancellation.

use alloy::primitives::B256;
use async_trait::async_trait;
use bridge_core::SettlementStatus;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{SettlementError, StatusError};
use crate::traits::StatusFeed;

/// Polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Fixed delay between requests.
    pub interval: Duration,
    /// Maximum number of requests.
    pub max_attempts: u32,
    /// Abort on the first malformed or unreachable response instead of
    /// counting it as a non-terminal observation.
    pub strict: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 60,
            strict: false,
        }
    }
}

/// What one status request produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    Reported(SettlementStatus),
    /// Transport failure or malformed body, tolerated in lenient mode.
    Unusable,
}

/// Poller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// `completed` requests have been made without a terminal answer.
    Waiting { completed: u32 },
    Done(SettlementStatus),
}

impl PollState {
    pub fn start(max_attempts: u32) -> Self {
        if max_attempts == 0 {
            Self::Done(SettlementStatus::TimedOut)
        } else {
            Self::Waiting { completed: 0 }
        }
    }

    /// Fold one observation into the state.
    pub fn step(self, observation: Observation, max_attempts: u32) -> Self {
        match self {
            Self::Done(_) => self,
            Self::Waiting { completed } => {
                if let Observation::Reported(status) = observation {
                    if status.is_terminal() {
                        return Self::Done(status);
                    }
                }
                let completed = completed + 1;
                if completed >= max_attempts {
                    Self::Done(SettlementStatus::TimedOut)
                } else {
                    Self::Waiting { completed }
                }
            }
        }
    }
}

/// Drives a [`StatusFeed`] until a terminal status or the attempt budget.
pub struct StatusPoller {
    feed: Arc<dyn StatusFeed>,
    config: PollConfig,
}

impl StatusPoller {
    pub fn new(feed: Arc<dyn StatusFeed>, config: PollConfig) -> Self {
        Self { feed, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Poll until `Completed`, `Failed` or `TimedOut`.
    ///
    /// Makes at most `max_attempts` requests and never sleeps after the last
    /// one. Cancellation is honoured before each request and during each
    /// sleep.
    pub async fn poll(
        &self,
        escrow_id: B256,
        cancel: &CancelToken,
    ) -> Result<SettlementStatus, SettlementError> {
        let max_attempts = self.config.max_attempts;
        let mut state = PollState::start(max_attempts);

        loop {
            let completed = match state {
                PollState::Done(status) => {
                    tracing::info!(%escrow_id, %status, "polling finished");
                    return Ok(status);
                }
                PollState::Waiting { completed } => completed,
            };

            if cancel.is_cancelled() {
                return Err(SettlementError::Cancelled { broadcast: true });
            }

            let observation = match self.feed.fetch_status(escrow_id).await {
                Ok(status) => {
                    tracing::debug!(%escrow_id, attempt = completed + 1, %status, "status observed");
                    Observation::Reported(status)
                }
                Err(e) if self.config.strict => return Err(e.into()),
                Err(e) => {
                    tracing::warn!(%escrow_id, attempt = completed + 1, error = %e, "unusable status response");
                    Observation::Unusable
                }
            };

            state = state.step(observation, max_attempts);

            if let PollState::Waiting { .. } = state {
                tokio::select! {
                    _ = tokio::time::sleep(self.config.interval) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!(%escrow_id, "polling cancelled");
                        return Err(SettlementError::Cancelled { broadcast: true });
                    }
                }
            }
        }
    }
}

/// Map a status body to a [`SettlementStatus`].
///
/// Accepts `{"status": "pending"}` as well as the nested
/// `{"status": {"status": "pending", "message": ..}}`. An `error` field, a
/// missing status or an unknown value is malformed.
pub fn interpret_status(body: &Value) -> Result<SettlementStatus, StatusError> {
    if let Some(err) = body.get("error") {
        return Err(StatusError::Malformed(format!("service error: {err}")));
    }
    let raw = match body.get("status") {
        Some(Value::String(s)) => s.as_str(),
        Some(nested @ Value::Object(_)) => return interpret_status(nested),
        Some(other) => {
            return Err(StatusError::Malformed(format!("unexpected status value: {other}")))
        }
        None => return Err(StatusError::Malformed("missing status field".into())),
    };
    SettlementStatus::from_wire(raw)
        .ok_or_else(|| StatusError::Malformed(format!("unknown status: {raw}")))
}

/// Status service client: `POST {base}/status` with `{"escrowId": "0x.."}`.
pub struct HttpStatusFeed {
    client: reqwest::Client,
    url: String,
}

impl HttpStatusFeed {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, StatusError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StatusError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/status", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl StatusFeed for HttpStatusFeed {
    async fn fetch_status(&self, escrow_id: B256) -> Result<SettlementStatus, StatusError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "escrowId": escrow_id.to_string() }))
            .send()
            .await
            .map_err(|e| StatusError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StatusError::Http(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StatusError::Malformed(e.to_string()))?;
        interpret_status(&body)
    }
}
