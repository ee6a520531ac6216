use super::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Offline,
    Online,
    NotParticipating,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    #[serde(default)]
    pub num_uint: u64,
    #[serde(default)]
    pub num_byte_slice: u64,
}

impl StateSchema {
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TealValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

pub type KeyValue = BTreeMap<String, TealValue>;

/// Resulting state of one account after a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountData {
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub micro_algos: u64,
    #[serde(default)]
    pub rewards_base: u64,
    #[serde(default)]
    pub rewarded_micro_algos: u64,
    #[serde(default)]
    pub auth_addr: Address,

    #[serde(default)]
    pub total_app_schema: StateSchema,
    #[serde(default)]
    pub total_extra_app_pages: u32,
    #[serde(default)]
    pub total_app_params: u64,
    #[serde(default)]
    pub total_app_local_states: u64,
    #[serde(default)]
    pub total_asset_params: u64,
    #[serde(default)]
    pub total_assets: u64,

    #[serde(default)]
    pub vote_id: Vec<u8>,
    #[serde(default)]
    pub selection_id: Vec<u8>,
    #[serde(default)]
    pub state_proof_id: Vec<u8>,
    #[serde(default)]
    pub vote_first_valid: u64,
    #[serde(default)]
    pub vote_last_valid: u64,
    #[serde(default)]
    pub vote_key_dilution: u64,
}

impl AccountData {
    /// A zero-valued account has been closed out and is stored as a tombstone.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub decimals: u32,
    #[serde(default)]
    pub default_frozen: bool,
    #[serde(default)]
    pub unit_name: String,
    #[serde(default)]
    pub asset_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub metadata_hash: Vec<u8>,
    #[serde(default)]
    pub manager: Address,
    #[serde(default)]
    pub reserve: Address,
    #[serde(default)]
    pub freeze: Address,
    #[serde(default)]
    pub clawback: Address,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHolding {
    pub amount: u64,
    #[serde(default)]
    pub frozen: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppParams {
    #[serde(default)]
    pub approval_program: Vec<u8>,
    #[serde(default)]
    pub clear_state_program: Vec<u8>,
    #[serde(default)]
    pub global_state: KeyValue,
    #[serde(default)]
    pub local_state_schema: StateSchema,
    #[serde(default)]
    pub global_state_schema: StateSchema,
    #[serde(default)]
    pub extra_program_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLocalState {
    #[serde(default)]
    pub schema: StateSchema,
    #[serde(default)]
    pub key_value: KeyValue,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParamsDelta {
    #[serde(default)]
    pub params: Option<AssetParams>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHoldingDelta {
    #[serde(default)]
    pub holding: Option<AssetHolding>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppParamsDelta {
    #[serde(default)]
    pub params: Option<AppParams>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLocalStateDelta {
    #[serde(default)]
    pub local_state: Option<AppLocalState>,
    #[serde(default)]
    pub deleted: bool,
}

/// Changes to one (address, asset) pair. `addr` is the creator on the params
/// side and the holder on the holding side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResourceRecord {
    pub aidx: u64,
    pub addr: Address,
    #[serde(default)]
    pub params: AssetParamsDelta,
    #[serde(default)]
    pub holding: AssetHoldingDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppResourceRecord {
    pub aidx: u64,
    pub addr: Address,
    #[serde(default)]
    pub params: AppParamsDelta,
    #[serde(default)]
    pub state: AppLocalStateDelta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub addr: Address,
    pub data: AccountData,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDeltas {
    #[serde(default)]
    pub accounts: Vec<BalanceRecord>,
    #[serde(default)]
    pub asset_resources: Vec<AssetResourceRecord>,
    #[serde(default)]
    pub app_resources: Vec<AppResourceRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgoCount {
    #[serde(default)]
    pub money: u64,
    #[serde(default)]
    pub reward_units: u64,
}

/// Ledger-wide balance aggregate, one row per store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTotals {
    #[serde(default)]
    pub online: AlgoCount,
    #[serde(default)]
    pub offline: AlgoCount,
    #[serde(default)]
    pub not_participating: AlgoCount,
    #[serde(default)]
    pub rewards_level: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    #[serde(default)]
    pub accts: AccountDeltas,
    #[serde(default)]
    pub totals: AccountTotals,
}
