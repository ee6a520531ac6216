//! Storage representation of ledger objects.
//!
//! Blobs are JSON. Account data is stored *trimmed*: balance and reward
//! bookkeeping live in their own columns and are dropped from the blob, then
//! restored by [`untrim_account_data`] when a row is read back.

use crate::error::{IndexerError, Result};
use crate::models::{
    AccountData, AccountStatus, AccountTotals, Address, AppLocalState, AppParams, AssetParams,
    SignedTxnWithAd, SpecialAddresses, StateSchema, Transaction,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256, Sha512_256};

/// Blob written in place of account data, params or local state on deleted rows.
pub const NULL_BLOB: &str = "null";

fn is_zero_u64(v: &u64) -> bool {
    *v == 0
}

fn is_zero_u32(v: &u32) -> bool {
    *v == 0
}

fn is_offline(s: &AccountStatus) -> bool {
    *s == AccountStatus::Offline
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimmedAccountData {
    #[serde(default, skip_serializing_if = "is_offline")]
    pub status: AccountStatus,
    #[serde(default, skip_serializing_if = "Address::is_zero")]
    pub auth_addr: Address,

    #[serde(default, skip_serializing_if = "StateSchema::is_zero")]
    pub total_app_schema: StateSchema,
    #[serde(default, skip_serializing_if = "is_zero_u32")]
    pub total_extra_app_pages: u32,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_app_params: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_app_local_states: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_asset_params: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub total_assets: u64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vote_id: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection_id: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub state_proof_id: Vec<u8>,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub vote_first_valid: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub vote_last_valid: u64,
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub vote_key_dilution: u64,
}

pub fn trim_account_data(ad: &AccountData) -> TrimmedAccountData {
    TrimmedAccountData {
        status: ad.status,
        auth_addr: ad.auth_addr,
        total_app_schema: ad.total_app_schema,
        total_extra_app_pages: ad.total_extra_app_pages,
        total_app_params: ad.total_app_params,
        total_app_local_states: ad.total_app_local_states,
        total_asset_params: ad.total_asset_params,
        total_assets: ad.total_assets,
        vote_id: ad.vote_id.clone(),
        selection_id: ad.selection_id.clone(),
        state_proof_id: ad.state_proof_id.clone(),
        vote_first_valid: ad.vote_first_valid,
        vote_last_valid: ad.vote_last_valid,
        vote_key_dilution: ad.vote_key_dilution,
    }
}

/// Rebuild full account data from the trimmed blob and the `account` row columns.
pub fn untrim_account_data(
    trimmed: TrimmedAccountData,
    micro_algos: u64,
    rewards_base: u64,
    rewarded_micro_algos: u64,
) -> AccountData {
    AccountData {
        status: trimmed.status,
        micro_algos,
        rewards_base,
        rewarded_micro_algos,
        auth_addr: trimmed.auth_addr,
        total_app_schema: trimmed.total_app_schema,
        total_extra_app_pages: trimmed.total_extra_app_pages,
        total_app_params: trimmed.total_app_params,
        total_app_local_states: trimmed.total_app_local_states,
        total_asset_params: trimmed.total_asset_params,
        total_assets: trimmed.total_assets,
        vote_id: trimmed.vote_id,
        selection_id: trimmed.selection_id,
        state_proof_id: trimmed.state_proof_id,
        vote_first_valid: trimmed.vote_first_valid,
        vote_last_valid: trimmed.vote_last_valid,
        vote_key_dilution: trimmed.vote_key_dilution,
    }
}

/// Side data stored next to each transaction row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnExtra {
    #[serde(default, skip_serializing_if = "is_zero_u64")]
    pub asset_close_amount: u64,
    /// Intra-round offset of the root transaction; set on inner transactions only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_intra: Option<u64>,
    /// Id of the root transaction; set on inner transactions only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_txid: Option<String>,
}

pub fn encode_trimmed_account_data(data: &TrimmedAccountData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Returns `None` for the tombstone marker written on deleted accounts.
pub fn decode_trimmed_account_data(blob: &str) -> Result<Option<TrimmedAccountData>> {
    Ok(serde_json::from_str(blob)?)
}

pub fn encode_signed_txn_with_ad(stxn_ad: &SignedTxnWithAd) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(stxn_ad)?)
}

pub fn decode_signed_txn_with_ad(bytes: &[u8]) -> Result<SignedTxnWithAd> {
    serde_json::from_slice(bytes)
        .map_err(|e| IndexerError::Decode(format!("signed transaction: {}", e)))
}

pub fn encode_txn_extra(extra: &TxnExtra) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(extra)?)
}

pub fn decode_txn_extra(bytes: &[u8]) -> Result<TxnExtra> {
    serde_json::from_slice(bytes).map_err(|e| IndexerError::Decode(format!("txn extra: {}", e)))
}

pub fn encode_special_addresses(addresses: &SpecialAddresses) -> Result<String> {
    Ok(serde_json::to_string(addresses)?)
}

pub fn encode_account_totals(totals: &AccountTotals) -> Result<String> {
    Ok(serde_json::to_string(totals)?)
}

pub fn encode_asset_params(params: &AssetParams) -> Result<String> {
    Ok(serde_json::to_string(params)?)
}

pub fn encode_app_params(params: &AppParams) -> Result<String> {
    Ok(serde_json::to_string(params)?)
}

pub fn encode_app_local_state(state: &AppLocalState) -> Result<String> {
    Ok(serde_json::to_string(state)?)
}

/// Content hash of a transaction: SHA-512/256 over the domain-separated
/// encoding, base58.
pub fn txn_id(txn: &Transaction) -> Result<String> {
    let mut hasher = Sha512_256::new();
    hasher.update(b"TX");
    hasher.update(serde_json::to_vec(txn)?);
    Ok(bs58::encode(hasher.finalize()).into_string())
}

/// Identifies an application by its approval program: SHA-256, base58.
pub fn approval_hash(program: &[u8]) -> String {
    bs58::encode(Sha256::digest(program)).into_string()
}
