//! EVM-family capability (typed transaction signing).

use alloy::primitives::Bytes;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::Signature;
use async_trait::async_trait;

use crate::capability::{CapabilityResult, WalletCapability};

#[async_trait]
pub trait EvmCapability: WalletCapability {
    /// EIP-155 chain id the wallet signs for.
    async fn chain_id(&self) -> CapabilityResult<u64>;

    /// Sign a complete typed transaction, returning the EIP-2718 encoded envelope.
    async fn sign_transaction(&self, tx: TransactionRequest) -> CapabilityResult<Bytes>;

    /// Sign message bytes with the Ethereum personal-message prefix.
    async fn sign_message(&self, message: &[u8]) -> CapabilityResult<Signature>;
}
