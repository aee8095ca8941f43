//! UTXO-family capability (PSBT signing).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityResult, WalletCapability};
use crate::chain::NetworkId;

/// One input the wallet is asked to sign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInput {
    pub index: u32,
    pub address: Option<String>,
    pub public_key: Option<String>,
    /// Sign with the untweaked key (script-path spends).
    #[serde(default)]
    pub disable_tweak_signer: bool,
}

/// Options for PSBT signing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignPsbtOptions {
    /// Finalize inputs after signing.
    pub auto_finalized: bool,
    /// Restrict signing to these inputs. Empty means "all inputs the wallet owns".
    pub sign_inputs: Vec<SignInput>,
}

/// Message signing scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageSigningKind {
    Ecdsa,
    Bip322Simple,
}

#[async_trait]
pub trait UtxoCapability: WalletCapability {
    /// Hex-encoded public key of the active account.
    async fn public_key_hex(&self) -> CapabilityResult<String>;

    /// Network the wallet is currently on.
    async fn network(&self) -> CapabilityResult<NetworkId>;

    /// Sign a hex-encoded PSBT, returning the signed PSBT hex.
    async fn sign_psbt(&self, psbt_hex: &str, options: &SignPsbtOptions) -> CapabilityResult<String>;

    /// Sign several PSBTs. Wallets without a batch API sign them one by one.
    async fn sign_psbts(
        &self,
        psbts_hex: &[String],
        options: &SignPsbtOptions,
    ) -> CapabilityResult<Vec<String>> {
        let mut signed = Vec::with_capacity(psbts_hex.len());
        for psbt in psbts_hex {
            signed.push(self.sign_psbt(psbt, options).await?);
        }
        Ok(signed)
    }

    /// Sign an arbitrary message, returning the base64 signature.
    async fn sign_message(&self, message: &str, kind: MessageSigningKind) -> CapabilityResult<String>;
}
