use super::{Address, AssetParams, Digest, Round, SpecialAddresses};
use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};

/// Transaction type tag stored in `txn.typeenum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TxnType {
    Payment = 1,
    KeyRegistration = 2,
    AssetConfig = 3,
    AssetTransfer = 4,
    AssetFreeze = 5,
    ApplicationCall = 6,
    StateProof = 7,
}

impl TxnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnType::Payment => "pay",
            TxnType::KeyRegistration => "keyreg",
            TxnType::AssetConfig => "acfg",
            TxnType::AssetTransfer => "axfer",
            TxnType::AssetFreeze => "afrz",
            TxnType::ApplicationCall => "appl",
            TxnType::StateProof => "stpf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TxnKind {
    Payment {
        receiver: Address,
        amount: u64,
        #[serde(default)]
        close_remainder_to: Address,
    },
    KeyRegistration {
        #[serde(default)]
        vote_pk: Vec<u8>,
        #[serde(default)]
        selection_pk: Vec<u8>,
        #[serde(default)]
        vote_first: Round,
        #[serde(default)]
        vote_last: Round,
        #[serde(default)]
        vote_key_dilution: u64,
        #[serde(default)]
        nonparticipation: bool,
    },
    AssetConfig {
        /// Zero when the transaction creates a new asset.
        #[serde(default)]
        config_asset: u64,
        #[serde(default)]
        params: Option<AssetParams>,
    },
    AssetTransfer {
        xfer_asset: u64,
        #[serde(default)]
        asset_amount: u64,
        /// Non-zero for clawback transfers.
        #[serde(default)]
        asset_sender: Address,
        asset_receiver: Address,
        #[serde(default)]
        asset_close_to: Address,
    },
    AssetFreeze {
        freeze_asset: u64,
        freeze_account: Address,
        frozen: bool,
    },
    ApplicationCall {
        /// Zero when the transaction creates a new application.
        #[serde(default)]
        application_id: u64,
        #[serde(default)]
        on_completion: u8,
        #[serde(default)]
        app_args: Vec<Vec<u8>>,
        #[serde(default)]
        accounts: Vec<Address>,
        #[serde(default)]
        foreign_apps: Vec<u64>,
        #[serde(default)]
        foreign_assets: Vec<u64>,
        #[serde(default)]
        approval_program: Vec<u8>,
        #[serde(default)]
        clear_state_program: Vec<u8>,
    },
    StateProof {
        #[serde(default)]
        state_proof_type: u64,
        #[serde(default)]
        message: Vec<u8>,
    },
}

impl TxnKind {
    pub fn txn_type(&self) -> TxnType {
        match self {
            TxnKind::Payment { .. } => TxnType::Payment,
            TxnKind::KeyRegistration { .. } => TxnType::KeyRegistration,
            TxnKind::AssetConfig { .. } => TxnType::AssetConfig,
            TxnKind::AssetTransfer { .. } => TxnType::AssetTransfer,
            TxnKind::AssetFreeze { .. } => TxnType::AssetFreeze,
            TxnKind::ApplicationCall { .. } => TxnType::ApplicationCall,
            TxnKind::StateProof { .. } => TxnType::StateProof,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub first_valid: Round,
    #[serde(default)]
    pub last_valid: Round,
    #[serde(default)]
    pub note: Vec<u8>,
    #[serde(default)]
    pub genesis_id: String,
    #[serde(default)]
    pub genesis_hash: Digest,
    #[serde(default)]
    pub rekey_to: Address,
    #[serde(flatten)]
    pub kind: TxnKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigSubsig {
    pub key: Vec<u8>,
    #[serde(default)]
    pub sig: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigSig {
    pub version: u8,
    pub threshold: u8,
    pub subsigs: Vec<MultisigSubsig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicSig {
    pub logic: Vec<u8>,
    #[serde(default)]
    pub args: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxnSignature {
    Sig(Vec<u8>),
    Msig(MultisigSig),
    Lsig(LogicSig),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTxn {
    pub txn: Transaction,
    /// Absent for inner transactions and state proofs.
    #[serde(default)]
    pub signature: Option<TxnSignature>,
    #[serde(default)]
    pub auth_addr: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalDelta {
    #[serde(default)]
    pub logs: Vec<Vec<u8>>,
    #[serde(default)]
    pub inner_txns: Vec<SignedTxnWithAd>,
}

/// Effects recorded when the transaction was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyData {
    #[serde(default)]
    pub closing_amount: u64,
    #[serde(default)]
    pub asset_closing_amount: u64,
    #[serde(default)]
    pub sender_rewards: u64,
    #[serde(default)]
    pub receiver_rewards: u64,
    #[serde(default)]
    pub close_rewards: u64,
    #[serde(default)]
    pub eval_delta: EvalDelta,
    /// Id of the asset created by this transaction, when the protocol records it.
    #[serde(default)]
    pub config_asset: u64,
    /// Id of the application created by this transaction, when the protocol records it.
    #[serde(default)]
    pub application_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTxnWithAd {
    #[serde(flatten)]
    pub signed_txn: SignedTxn,
    #[serde(default)]
    pub apply_data: ApplyData,
}

impl SignedTxnWithAd {
    pub fn txn(&self) -> &Transaction {
        &self.signed_txn.txn
    }

    pub fn inner_txns(&self) -> &[SignedTxnWithAd] {
        &self.apply_data.eval_delta.inner_txns
    }
}

/// A transaction as carried in a block's payset. Genesis fields identical to
/// the block header's are elided and flagged instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTxnInBlock {
    #[serde(flatten)]
    pub stxn_ad: SignedTxnWithAd,
    #[serde(default)]
    pub has_genesis_id: bool,
    #[serde(default)]
    pub has_genesis_hash: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub round: Round,
    #[serde(default)]
    pub genesis_id: String,
    #[serde(default)]
    pub genesis_hash: Digest,
    /// Transactions (and created creatables) counted up to and including this block.
    pub txn_counter: u64,
    pub fee_sink: Address,
    pub rewards_pool: Address,
    #[serde(default)]
    pub payset: Vec<SignedTxnInBlock>,
}

impl Block {
    pub fn special_addresses(&self) -> SpecialAddresses {
        SpecialAddresses {
            fee_sink: self.fee_sink,
            rewards_pool: self.rewards_pool,
        }
    }

    /// Counter value before the first transaction of this block was applied.
    pub fn txn_counter_at_start(&self) -> u64 {
        self.txn_counter.saturating_sub(self.payset.len() as u64)
    }

    /// Restore the genesis fields elided from a payset entry so that the
    /// transaction hashes to its canonical id.
    pub fn decode_signed_txn(&self, stib: &SignedTxnInBlock) -> Result<SignedTxnWithAd> {
        let mut stxn_ad = stib.stxn_ad.clone();
        let txn = &mut stxn_ad.signed_txn.txn;

        if stib.has_genesis_id {
            if !txn.genesis_id.is_empty() {
                return Err(IndexerError::Decode(format!(
                    "round {}: genesis id {:?} present although elided",
                    self.round, txn.genesis_id
                )));
            }
            txn.genesis_id = self.genesis_id.clone();
        }

        if stib.has_genesis_hash {
            if txn.genesis_hash != Digest::default() {
                return Err(IndexerError::Decode(format!(
                    "round {}: genesis hash present although elided",
                    self.round
                )));
            }
            txn.genesis_hash = self.genesis_hash;
        }

        Ok(stxn_ad)
    }
}
