//! EVM connector backed by a local private key.
//!
//! # Security
//! - Keys are loaded from an environment variable or passed in directly
//! - Keys are never logged or serialized

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::{Signature, Signer};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capability::{
    Capability, CapabilityError, CapabilityFactory, CapabilityResult, EvmCapability,
    FactoryContext, WalletCapability,
};
use crate::chain::{ChainFamily, NetworkProfile};
use crate::registry::WalletMetadata;

/// Environment variable holding the hex private key.
pub const PRIVATE_KEY_ENV_VAR: &str = "CHAIN_CONNECT_EVM_PRIVATE_KEY";

pub const LOCAL_KEY_CONNECTOR_ID: &str = "local-key";

/// Factory for [`LocalKeyWallet`]s.
#[derive(Clone)]
pub struct LocalKeyConnector {
    signer: PrivateKeySigner,
}

impl LocalKeyConnector {
    /// Parse a hex private key, with or without `0x`.
    pub fn from_private_key(private_key_hex: &str) -> CapabilityResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| CapabilityError::Backend(format!("Invalid private key format: {e}")))?;
        Ok(Self { signer })
    }

    /// Reads `CHAIN_CONNECT_EVM_PRIVATE_KEY`.
    pub fn from_env() -> CapabilityResult<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV_VAR).map_err(|_| {
            CapabilityError::Backend(format!("Environment variable {PRIVATE_KEY_ENV_VAR} not set"))
        })?;
        Self::from_private_key(&private_key)
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Registry entry supporting every EVM preset network.
    pub fn metadata(self) -> WalletMetadata {
        let networks = [NetworkProfile::Mainnet, NetworkProfile::Testnet, NetworkProfile::Devnet]
            .map(|p| p.preset(ChainFamily::Evm).network);
        WalletMetadata::new(LOCAL_KEY_CONNECTOR_ID, "Local key", Arc::new(self)).with_networks(networks)
    }
}

impl fmt::Debug for LocalKeyConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyConnector")
            .field("address", &self.signer.address())
            .finish()
    }
}

#[async_trait]
impl CapabilityFactory for LocalKeyConnector {
    async fn create(&self, ctx: FactoryContext) -> CapabilityResult<Capability> {
        let chain_id = ctx.network.numeric_id;
        if chain_id == 0 {
            return Err(CapabilityError::Unsupported(format!(
                "network {} has no EIP-155 chain id",
                ctx.network.network
            )));
        }

        let wallet = LocalKeyWallet::new(self.signer.clone(), chain_id);
        tracing::info!(address = %wallet.signer.address(), chain_id, "Local key wallet connected");
        Ok(Capability::Evm(Arc::new(wallet)))
    }
}

/// Connected capability for one chain id.
pub struct LocalKeyWallet {
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
    chain_id: u64,
    connected: AtomicBool,
}

impl LocalKeyWallet {
    fn new(signer: PrivateKeySigner, chain_id: u64) -> Self {
        let signer = signer.with_chain_id(Some(chain_id));
        Self {
            wallet: EthereumWallet::from(signer.clone()),
            signer,
            chain_id,
            connected: AtomicBool::new(true),
        }
    }

    fn ensure_connected(&self) -> CapabilityResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CapabilityError::Disconnected)
        }
    }
}

#[async_trait]
impl WalletCapability for LocalKeyWallet {
    fn address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn disconnect(&self) -> CapabilityResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        tracing::debug!(address = %self.signer.address(), "Local key wallet disconnected");
        Ok(())
    }
}

#[async_trait]
impl EvmCapability for LocalKeyWallet {
    async fn chain_id(&self) -> CapabilityResult<u64> {
        self.ensure_connected()?;
        Ok(self.chain_id)
    }

    async fn sign_transaction(&self, tx: TransactionRequest) -> CapabilityResult<Bytes> {
        self.ensure_connected()?;
        let tx = match tx.chain_id {
            Some(id) if id != self.chain_id => {
                return Err(CapabilityError::Rejected(format!(
                    "transaction chain id {id} does not match wallet chain id {}",
                    self.chain_id
                )))
            }
            Some(_) => tx,
            None => tx.with_chain_id(self.chain_id),
        };

        let envelope = tx
            .build(&self.wallet)
            .await
            .map_err(|e| CapabilityError::Backend(format!("Transaction signing failed: {e}")))?;
        Ok(Bytes::from(envelope.encoded_2718()))
    }

    async fn sign_message(&self, message: &[u8]) -> CapabilityResult<Signature> {
        self.ensure_connected()?;
        self.signer
            .sign_message(message)
            .await
            .map_err(|e| CapabilityError::Backend(format!("Message signing failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectorEventSink;
    use alloy::primitives::U256;

    // Anvil's first account.
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn ctx(profile: NetworkProfile) -> FactoryContext {
        FactoryContext {
            network: profile.preset(ChainFamily::Evm),
            shared_config: None,
            events: ConnectorEventSink::detached(),
        }
    }

    async fn connect(profile: NetworkProfile) -> Arc<dyn EvmCapability> {
        let connector = LocalKeyConnector::from_private_key(TEST_PRIVATE_KEY).unwrap();
        match connector.create(ctx(profile)).await.unwrap() {
            Capability::Evm(wallet) => wallet,
            other => panic!("unexpected capability {other:?}"),
        }
    }

    #[test]
    fn test_key_parsing() {
        let connector = LocalKeyConnector::from_private_key(&format!("0x{TEST_PRIVATE_KEY}")).unwrap();
        assert_eq!(
            connector.address().to_string().to_lowercase(),
            "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
        );

        let err = LocalKeyConnector::from_private_key("invalid_key").unwrap_err();
        assert!(err.to_string().contains("Invalid private key"));
    }

    #[test]
    fn test_metadata_covers_evm_presets() {
        let metadata = LocalKeyConnector::from_private_key(TEST_PRIVATE_KEY).unwrap().metadata();
        assert_eq!(metadata.id, LOCAL_KEY_CONNECTOR_ID);
        assert!(metadata.supports(&"eip155:31337".into()));
        assert!(!metadata.supports(&"signet".into()));
    }

    #[tokio::test]
    async fn test_sign_message() {
        let wallet = connect(NetworkProfile::Devnet).await;
        assert_eq!(wallet.chain_id().await.unwrap(), 31337);
        let signature = wallet.sign_message(b"Hello, World!").await.unwrap();
        assert_eq!(signature.as_bytes().len(), 65);
    }

    #[tokio::test]
    async fn test_sign_eip1559_transaction() {
        let wallet = connect(NetworkProfile::Devnet).await;
        let tx = TransactionRequest::default()
            .with_to(Address::ZERO)
            .with_value(U256::from(1))
            .with_nonce(0)
            .with_gas_limit(21_000)
            .with_max_fee_per_gas(2_000_000_000)
            .with_max_priority_fee_per_gas(1_000_000_000);

        let raw = wallet.sign_transaction(tx).await.unwrap();
        // EIP-2718 type byte for EIP-1559.
        assert_eq!(raw[0], 0x02);
    }

    #[tokio::test]
    async fn test_wrong_chain_and_disconnected() {
        let wallet = connect(NetworkProfile::Testnet).await;
        let tx = TransactionRequest::default().with_chain_id(1);
        assert!(matches!(
            wallet.sign_transaction(tx).await,
            Err(CapabilityError::Rejected(_))
        ));

        wallet.disconnect().await.unwrap();
        assert_eq!(wallet.chain_id().await.unwrap_err(), CapabilityError::Disconnected);
    }

    #[tokio::test]
    async fn test_non_evm_network_unsupported() {
        let connector = LocalKeyConnector::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let mut ctx = ctx(NetworkProfile::Testnet);
        ctx.network.numeric_id = 0;
        assert!(matches!(
            connector.create(ctx).await,
            Err(CapabilityError::Unsupported(_))
        ));
    }
}
