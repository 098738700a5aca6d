use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::reqwest::Url;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;

use crate::error::ChainError;
use crate::initiator::{InitiationCall, PreparedSubmission};
use crate::traits::EscrowChain;

sol! {
    #[sol(rpc)]
    interface IEscrowBridge {
        function recipientEmail() external view returns (string memory);
        function usdcToken() external view returns (address);
        function getFreeBalance() external view returns (uint256);
        function getUsdcBalance() external view returns (uint256);
        function initPayment(bytes32 idHash, bytes32 emailHash, uint256 amount) external;
        function initPayment(bytes32 idHash, bytes32 emailHash, uint256 amount, address recipient) external;
    }

    #[sol(rpc)]
    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
    }
}

/// EIP-1193 code for a request the user declined.
const USER_REJECTED: i64 = 4001;

/// Escrow contract on an EVM JSON-RPC node, signing with a local key.
pub struct EvmEscrowChain {
    provider: DynProvider,
    wallet: EthereumWallet,
    escrow: Address,
    sender: Address,
}

impl EvmEscrowChain {
    pub fn connect(rpc_url: &str, escrow: Address, signer: PrivateKeySigner) -> Result<Self, ChainError> {
        let url = rpc_url
            .parse::<Url>()
            .map_err(|e| ChainError::Rpc(format!("invalid rpc url {rpc_url}: {e}")))?;
        let sender = signer.address();
        let wallet = EthereumWallet::from(signer);
        let provider = ProviderBuilder::new().wallet(wallet.clone()).connect_http(url);

        tracing::info!(%escrow, %sender, rpc_url, "connected escrow chain");
        Ok(Self {
            provider: DynProvider::new(provider),
            wallet,
            escrow,
            sender,
        })
    }

    fn escrow(&self) -> IEscrowBridge::IEscrowBridgeInstance<DynProvider> {
        IEscrowBridge::new(self.escrow, self.provider.clone())
    }

    fn request(&self, call: &InitiationCall) -> TransactionRequest {
        let escrow = self.escrow();
        let request = match call {
            InitiationCall::Plain {
                id_hash,
                email_hash,
                amount,
            } => escrow
                .initPayment_0(*id_hash, *email_hash, *amount)
                .into_transaction_request(),
            InitiationCall::RecipientOverride {
                id_hash,
                email_hash,
                amount,
                recipient,
            } => escrow
                .initPayment_1(*id_hash, *email_hash, *amount, *recipient)
                .into_transaction_request(),
        };
        request.with_from(self.sender)
    }
}

fn classify_rpc(err: &RpcError<TransportErrorKind>) -> ChainError {
    if let Some(payload) = err.as_error_resp() {
        if payload.code == USER_REJECTED {
            return ChainError::SignerRejected;
        }
        if payload.message.contains("revert") {
            return ChainError::Reverted(payload.message.to_string());
        }
    }
    ChainError::Rpc(err.to_string())
}

fn classify(err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(e) => classify_rpc(&e),
        other => ChainError::Decode(other.to_string()),
    }
}

#[async_trait]
impl EscrowChain for EvmEscrowChain {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn recipient_email(&self) -> Result<String, ChainError> {
        self.escrow().recipientEmail().call().await.map_err(classify)
    }

    async fn token_address(&self) -> Result<Address, ChainError> {
        self.escrow().usdcToken().call().await.map_err(classify)
    }

    async fn token_decimals(&self, token: Address) -> Result<u8, ChainError> {
        IERC20::new(token, self.provider.clone())
            .decimals()
            .call()
            .await
            .map_err(classify)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        IERC20::new(token, self.provider.clone())
            .balanceOf(owner)
            .call()
            .await
            .map_err(classify)
    }

    async fn contract_token_balance(&self) -> Result<U256, ChainError> {
        self.escrow().getUsdcBalance().call().await.map_err(classify)
    }

    async fn free_balance(&self) -> Result<U256, ChainError> {
        self.escrow().getFreeBalance().call().await.map_err(classify)
    }

    async fn prepare(&self, call: &InitiationCall) -> Result<PreparedSubmission, ChainError> {
        let request = self.request(call);

        let gas = self
            .provider
            .estimate_gas(request.clone())
            .await
            .map_err(|e| classify_rpc(&e))?;
        let nonce = self
            .provider
            .get_transaction_count(self.sender)
            .pending()
            .await
            .map_err(|e| classify_rpc(&e))?;
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| classify_rpc(&e))?;
        let chain_id = self.provider.get_chain_id().await.map_err(|e| classify_rpc(&e))?;

        let envelope = request
            .with_gas_limit(gas)
            .with_nonce(nonce)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .with_chain_id(chain_id)
            .build(&self.wallet)
            .await
            .map_err(|e| ChainError::Rpc(format!("signing failed: {e}")))?;

        tracing::debug!(id_hash = %call.id_hash(), gas, nonce, "escrow transaction signed");
        Ok(PreparedSubmission {
            call: call.clone(),
            raw: Bytes::from(envelope.encoded_2718()),
        })
    }

    async fn broadcast(&self, prepared: PreparedSubmission) -> Result<TxHash, ChainError> {
        let pending = self
            .provider
            .send_raw_transaction(&prepared.raw)
            .await
            .map_err(|e| classify_rpc(&e))?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_confirmation(
        &self,
        tx_hash: TxHash,
        confirmations: u64,
    ) -> Result<Option<u64>, ChainError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(confirmations)
            .get_receipt()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        if !receipt.status() {
            return Err(ChainError::Reverted(format!("transaction {tx_hash} reverted")));
        }
        Ok(receipt.block_number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;
    use alloy::sol_types::SolCall;

    #[test]
    fn test_overload_selectors_match_signatures() {
        assert_eq!(
            IEscrowBridge::initPayment_0Call::SIGNATURE,
            "initPayment(bytes32,bytes32,uint256)"
        );
        assert_eq!(
            IEscrowBridge::initPayment_1Call::SIGNATURE,
            "initPayment(bytes32,bytes32,uint256,address)"
        );
    }

    #[test]
    fn test_plain_call_encoding() {
        let call = IEscrowBridge::initPayment_0Call {
            idHash: B256::repeat_byte(1),
            emailHash: B256::repeat_byte(2),
            amount: U256::from(12_340_000u64),
        };
        let data = call.abi_encode();
        assert_eq!(data.len(), 4 + 3 * 32);
        assert_eq!(&data[4..36], B256::repeat_byte(1).as_slice());
    }

    #[test]
    fn test_invalid_rpc_url() {
        let signer = PrivateKeySigner::random();
        let result = EvmEscrowChain::connect("not a url", Address::ZERO, signer);
        assert!(matches!(result, Err(ChainError::Rpc(_))));
    }

    #[test]
    fn test_connect_records_sender() {
        let signer = PrivateKeySigner::random();
        let expected = signer.address();
        let chain = EvmEscrowChain::connect("http://127.0.0.1:8545", Address::ZERO, signer).unwrap();
        assert_eq!(chain.sender(), expected);
    }
}
