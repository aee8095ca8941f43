//! Cosmos-family capability (direct and amino signing).
//!
//! Sign documents are passed as already-encoded bytes; protobuf and amino
//! encoding happen outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::{CapabilityResult, WalletCapability};

/// An account exposed by a Cosmos wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    pub address: String,
    /// Signing algorithm, e.g. "secp256k1".
    pub algo: String,
    pub pubkey: Vec<u8>,
}

/// Protobuf `SignDoc` with its body and auth info already encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignDoc {
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub type_url: String,
    /// Base64-encoded key.
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKey,
    /// Base64-encoded signature.
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectSignResponse {
    /// The document actually signed; wallets may adjust fees.
    pub signed: SignDoc,
    pub signature: StdSignature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AminoSignResponse {
    pub signed: serde_json::Value,
    pub signature: StdSignature,
}

#[async_trait]
pub trait CosmosCapability: WalletCapability {
    async fn accounts(&self) -> CapabilityResult<Vec<AccountData>>;

    async fn sign_direct(
        &self,
        signer_address: &str,
        sign_doc: SignDoc,
    ) -> CapabilityResult<DirectSignResponse>;

    /// Sign a legacy amino `StdSignDoc` given as JSON.
    async fn sign_amino(
        &self,
        signer_address: &str,
        sign_doc: serde_json::Value,
    ) -> CapabilityResult<AminoSignResponse>;
}
