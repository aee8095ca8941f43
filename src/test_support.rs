//! Mock connectors shared by unit tests.

use alloy::primitives::Bytes;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::Signature;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use crate::capability::cosmos::{AccountData, AminoSignResponse, DirectSignResponse, SignDoc};
use crate::capability::utxo::{MessageSigningKind, SignPsbtOptions};
use crate::capability::{
    Capability, CapabilityError, CapabilityFactory, CapabilityResult, CosmosCapability,
    EvmCapability, FactoryContext, UtxoCapability, WalletCapability,
};
use crate::chain::{ChainFamily, NetworkId, NetworkProfile};
use crate::connection::manager::ConnectorEventSink;
use crate::registry::WalletMetadata;

const PROFILES: [NetworkProfile; 3] = [
    NetworkProfile::Mainnet,
    NetworkProfile::Testnet,
    NetworkProfile::Devnet,
];

fn every_network() -> Vec<NetworkId> {
    PROFILES
        .iter()
        .flat_map(|p| ChainFamily::ALL.map(|f| p.preset(f).network))
        .collect()
}

/// Metadata backed by a factory that always succeeds.
pub(crate) fn metadata(id: &str) -> WalletMetadata {
    MockFactory::new(ChainFamily::Utxo).metadata(id)
}

pub(crate) struct MockWallet {
    address: String,
    disconnect_delay: Duration,
    disconnects: AtomicUsize,
}

impl MockWallet {
    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WalletCapability for MockWallet {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn disconnect(&self) -> CapabilityResult<()> {
        if !self.disconnect_delay.is_zero() {
            tokio::time::sleep(self.disconnect_delay).await;
        }
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl UtxoCapability for MockWallet {
    async fn public_key_hex(&self) -> CapabilityResult<String> {
        Ok("02".repeat(33))
    }

    async fn network(&self) -> CapabilityResult<NetworkId> {
        Ok(NetworkId::new("signet"))
    }

    async fn sign_psbt(&self, psbt_hex: &str, _options: &SignPsbtOptions) -> CapabilityResult<String> {
        Ok(format!("signed:{psbt_hex}"))
    }

    async fn sign_message(&self, message: &str, _kind: MessageSigningKind) -> CapabilityResult<String> {
        Ok(format!("sig:{message}"))
    }
}

#[async_trait]
impl CosmosCapability for MockWallet {
    async fn accounts(&self) -> CapabilityResult<Vec<AccountData>> {
        Ok(vec![AccountData {
            address: self.address.clone(),
            algo: "secp256k1".into(),
            pubkey: vec![2; 33],
        }])
    }

    async fn sign_direct(&self, _signer: &str, _doc: SignDoc) -> CapabilityResult<DirectSignResponse> {
        Err(CapabilityError::Unsupported("mock".into()))
    }

    async fn sign_amino(
        &self,
        _signer: &str,
        _doc: serde_json::Value,
    ) -> CapabilityResult<AminoSignResponse> {
        Err(CapabilityError::Unsupported("mock".into()))
    }
}

#[async_trait]
impl EvmCapability for MockWallet {
    async fn chain_id(&self) -> CapabilityResult<u64> {
        Ok(11_155_111)
    }

    async fn sign_transaction(&self, _tx: TransactionRequest) -> CapabilityResult<Bytes> {
        Ok(Bytes::new())
    }

    async fn sign_message(&self, _message: &[u8]) -> CapabilityResult<Signature> {
        Err(CapabilityError::Unsupported("mock".into()))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Succeed,
    Fail(String),
    Hang,
}

/// Factory producing [`MockWallet`]s of one family, with scripted outcomes.
pub(crate) struct MockFactory {
    family: ChainFamily,
    gate: Option<Notify>,
    outcome: Mutex<Outcome>,
    disconnect_delay: Mutex<Duration>,
    calls: AtomicUsize,
    wallets: Mutex<Vec<Arc<MockWallet>>>,
    last_sink: Mutex<Option<ConnectorEventSink>>,
    seen_network_label: Mutex<Option<String>>,
}

impl MockFactory {
    pub(crate) fn new(family: ChainFamily) -> Arc<Self> {
        Arc::new(Self::build(family, None))
    }

    /// Every `create` waits for one [`release`](Self::release).
    pub(crate) fn gated(family: ChainFamily) -> Arc<Self> {
        Arc::new(Self::build(family, Some(Notify::new())))
    }

    fn build(family: ChainFamily, gate: Option<Notify>) -> Self {
        Self {
            family,
            gate,
            outcome: Mutex::new(Outcome::Succeed),
            disconnect_delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
            wallets: Mutex::new(Vec::new()),
            last_sink: Mutex::new(None),
            seen_network_label: Mutex::new(None),
        }
    }

    pub(crate) fn metadata(self: &Arc<Self>, id: &str) -> WalletMetadata {
        WalletMetadata::new(id, id.to_uppercase(), self.clone()).with_networks(every_network())
    }

    pub(crate) fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub(crate) fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Wallets created from now on take `delay` to disconnect.
    pub(crate) fn set_disconnect_delay(&self, delay: Duration) {
        *self.disconnect_delay.lock().unwrap() = delay;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn wallet(&self, index: usize) -> Arc<MockWallet> {
        self.wallets.lock().unwrap()[index].clone()
    }

    pub(crate) fn last_sink(&self) -> Option<ConnectorEventSink> {
        self.last_sink.lock().unwrap().clone()
    }

    pub(crate) fn seen_network_label(&self) -> Option<String> {
        self.seen_network_label.lock().unwrap().clone()
    }
}

#[async_trait]
impl CapabilityFactory for MockFactory {
    async fn create(&self, ctx: FactoryContext) -> CapabilityResult<Capability> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_sink.lock().unwrap() = Some(ctx.events.clone());
        *self.seen_network_label.lock().unwrap() = ctx.shared_config.as_ref().map(|c| c.network_label.clone());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            Outcome::Succeed => {}
            Outcome::Fail(reason) => return Err(CapabilityError::Rejected(reason)),
            Outcome::Hang => std::future::pending::<()>().await,
        }

        let wallet = Arc::new(MockWallet {
            address: format!("mock-{}-{n}", self.family),
            disconnect_delay: *self.disconnect_delay.lock().unwrap(),
            disconnects: AtomicUsize::new(0),
        });
        self.wallets.lock().unwrap().push(wallet.clone());

        Ok(match self.family {
            ChainFamily::Utxo => Capability::Utxo(wallet),
            ChainFamily::Cosmos => Capability::Cosmos(wallet),
            ChainFamily::Evm => Capability::Evm(wallet),
        })
    }
}
