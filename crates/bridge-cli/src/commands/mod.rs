pub mod balance;
pub mod health;
pub mod init;
pub mod pay;
pub mod status;

use alloy::primitives::{Address, U256};
use anyhow::Context as _;
use bridge_core::{BridgeConfig, SettlementStatus};
use bridge_settlement::adapters::{
    CallLog, EvmEscrowChain, MemoryEscrow, MemoryRegistry, ScriptedStatusFeed,
};
use bridge_settlement::{
    build_signer, cancel_pair, choose_candidate, collect_candidates, CancelToken, EscrowChain,
    HttpSaltRegistry, HttpStatusFeed, OrchestratorConfig, SaltRegistry, SettlementOrchestrator,
    StatusFeed,
};
use clap::Args;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable consulted for the signing key.
pub const PRIVATE_KEY_ENV: &str = "ESCROW_BRIDGE_PRIVATE_KEY";

/// A command outcome that ends the process with a specific exit code.
///
/// The message is already user-facing and is printed as is.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub code: u8,
    pub message: String,
}

impl CommandFailure {
    pub fn new(code: u8, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Settings shared by every command.
pub struct Context {
    pub config: BridgeConfig,
    pub simulate: bool,
}

/// Signer selection flags.
#[derive(Args, Debug, Default)]
pub struct SignerArgs {
    /// Hex private key. Takes precedence over the environment and key file.
    #[arg(long, value_name = "HEX")]
    pub private_key: Option<String>,
}

/// Address used as the signer in simulated runs.
fn simulated_sender() -> Address {
    Address::repeat_byte(0x5e)
}

fn usdc(whole: u64) -> U256 {
    U256::from(whole) * U256::from(1_000_000u64)
}

impl Context {
    /// The escrow chain backend for this run.
    pub fn chain(&self, signer: &SignerArgs) -> anyhow::Result<Arc<dyn EscrowChain>> {
        if self.simulate {
            let chain = MemoryEscrow::new(simulated_sender(), CallLog::new())
                .with_wallet_balance(usdc(250))
                .with_free_balance(usdc(1_000));
            return Ok(Arc::new(chain));
        }

        let candidates = collect_candidates(
            signer.private_key.clone(),
            std::env::var(PRIVATE_KEY_ENV).ok(),
            self.config.wallet.key_file.as_deref(),
        )?;
        let signer = build_signer(choose_candidate(&candidates)?)?;
        let escrow = self.config.escrow_address()?;
        let chain = EvmEscrowChain::connect(&self.config.chain.rpc_url, escrow, signer)?;
        Ok(Arc::new(chain))
    }

    /// The status feed used for polling.
    pub fn status_feed(&self) -> anyhow::Result<Arc<dyn StatusFeed>> {
        if self.simulate {
            return Ok(Arc::new(ScriptedStatusFeed::new([
                Ok(SettlementStatus::Pending),
                Ok(SettlementStatus::Completed),
            ])));
        }
        let feed = HttpStatusFeed::new(&self.config.endpoints.status_url, self.config.http_timeout())
            .context("building status client")?;
        Ok(Arc::new(feed))
    }

    fn registry(&self) -> anyhow::Result<Arc<dyn SaltRegistry>> {
        if self.simulate {
            return Ok(Arc::new(MemoryRegistry::new(CallLog::new())));
        }
        let registry =
            HttpSaltRegistry::new(&self.config.endpoints.registry_url, self.config.http_timeout())
                .context("building registry client")?;
        Ok(Arc::new(registry))
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::from(&self.config);
        if self.simulate {
            config.polling.interval = Duration::from_millis(200);
        }
        config
    }

    pub fn orchestrator(&self, signer: &SignerArgs) -> anyhow::Result<SettlementOrchestrator> {
        Ok(SettlementOrchestrator::new(
            self.chain(signer)?,
            self.registry()?,
            self.status_feed()?,
            self.orchestrator_config(),
        ))
    }
}

/// A cancellation token tripped by Ctrl-C.
pub fn ctrl_c_token() -> CancelToken {
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling...");
            handle.cancel();
        }
    });
    token
}
