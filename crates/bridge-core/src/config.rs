//! Client configuration loading and management.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::address::parse_address;
use crate::error::CoreError;

/// Full configuration for the settlement client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    /// Off-chain service endpoints.
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Chain and escrow contract settings.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Settlement status polling.
    #[serde(default)]
    pub polling: PollingConfig,

    /// Signer settings.
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Base URL of the salt registry (`POST /api/store_salt`).
    #[serde(default = "default_registry_url")]
    pub registry_url: String,
    /// Base URL of the settlement status service (`POST /status`).
    #[serde(default = "default_status_url")]
    pub status_url: String,
    /// Base URL of the bridge read API (`/health`, `/status/{id}`, ...).
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Escrow contract address.
    #[serde(default = "default_escrow_address")]
    pub escrow_address: String,
    /// Confirmations required before a submission counts as confirmed.
    #[serde(default = "default_confirmations")]
    pub confirmations: u64,
    /// Upper bound on the confirmation wait, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    /// Precision used to parse payment amounts.
    #[serde(default = "default_amount_decimals")]
    pub amount_decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Fixed delay between status requests, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
    /// Maximum number of status requests.
    #[serde(default = "default_poll_max_attempts")]
    pub max_attempts: u32,
    /// Abort on the first malformed or unreachable response.
    #[serde(default)]
    pub strict: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WalletConfig {
    /// File holding a hex private key.
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_registry_url() -> String {
    "http://localhost:5045".into()
}
fn default_status_url() -> String {
    "http://localhost:4028".into()
}
fn default_api_url() -> String {
    "http://localhost:8000".into()
}
fn default_http_timeout_secs() -> u64 {
    30
}
fn default_rpc_url() -> String {
    "https://rpc.primordial.bdagscan.com/".into()
}
fn default_escrow_address() -> String {
    "0xf11692c3AD99C121923288630F7e21e1d57b3689".into()
}
fn default_confirmations() -> u64 {
    1
}
fn default_confirmation_timeout_secs() -> u64 {
    180
}
fn default_amount_decimals() -> u8 {
    crate::amount::PAYMENT_DECIMALS
}
fn default_poll_interval_secs() -> u64 {
    5
}
fn default_poll_max_attempts() -> u32 {
    60
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            status_url: default_status_url(),
            api_url: default_api_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            escrow_address: default_escrow_address(),
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            amount_decimals: default_amount_decimals(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval_secs(),
            max_attempts: default_poll_max_attempts(),
            strict: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl BridgeConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: BridgeConfig = toml::from_str(&contents)
                .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// The configured escrow contract address.
    pub fn escrow_address(&self) -> Result<Address, CoreError> {
        parse_address(&self.chain.escrow_address)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.chain.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.polling.interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.endpoints.http_timeout_secs)
    }
}
