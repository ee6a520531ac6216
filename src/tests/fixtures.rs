//! Builders for blocks, transactions and deltas shared by the store tests.

use crate::blockchain::materializer::{yield_transactions, TxnRow};
use crate::db::migration::run_migrations;
use crate::error::Result;
use crate::models::{
    AccountData, ApplyData, Address, Block, EvalDelta, SignedTxn, SignedTxnInBlock,
    SignedTxnWithAd, Transaction, TxnKind, TxnSignature,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Connection, SqliteConnection, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub const GENESIS_ID: &str = "testnet-v1.0";

pub fn make_address(i: u8) -> Address {
    let mut address = [0u8; 32];
    address[0] = i;
    Address(address)
}

pub fn payment(receiver: Address, amount: u64) -> TxnKind {
    TxnKind::Payment {
        receiver,
        amount,
        close_remainder_to: Address::ZERO,
    }
}

pub fn app_call(application_id: u64) -> TxnKind {
    TxnKind::ApplicationCall {
        application_id,
        on_completion: 0,
        app_args: vec![],
        accounts: vec![],
        foreign_apps: vec![],
        foreign_assets: vec![],
        approval_program: vec![],
        clear_state_program: vec![],
    }
}

pub fn asset_config(config_asset: u64) -> TxnKind {
    TxnKind::AssetConfig {
        config_asset,
        params: None,
    }
}

pub fn asset_transfer(xfer_asset: u64, asset_receiver: Address) -> TxnKind {
    TxnKind::AssetTransfer {
        xfer_asset,
        asset_amount: 1,
        asset_sender: Address::ZERO,
        asset_receiver,
        asset_close_to: Address::ZERO,
    }
}

pub fn asset_freeze(freeze_asset: u64, freeze_account: Address) -> TxnKind {
    TxnKind::AssetFreeze {
        freeze_asset,
        freeze_account,
        frozen: true,
    }
}

pub fn transaction(sender: Address, kind: TxnKind) -> Transaction {
    Transaction {
        sender,
        fee: 1000,
        first_valid: 1,
        last_valid: 1001,
        note: vec![],
        genesis_id: String::new(),
        genesis_hash: [0u8; 32],
        rekey_to: Address::ZERO,
        kind,
    }
}

/// Top-level transaction signed with a plain signature.
pub fn signed(sender: Address, kind: TxnKind) -> SignedTxnWithAd {
    SignedTxnWithAd {
        signed_txn: SignedTxn {
            txn: transaction(sender, kind),
            signature: Some(TxnSignature::Sig(vec![1u8; 64])),
            auth_addr: Address::ZERO,
        },
        apply_data: ApplyData::default(),
    }
}

/// Inner transaction: no signature, optional children.
pub fn inner(sender: Address, kind: TxnKind, children: Vec<SignedTxnWithAd>) -> SignedTxnWithAd {
    SignedTxnWithAd {
        signed_txn: SignedTxn {
            txn: transaction(sender, kind),
            signature: None,
            auth_addr: Address::ZERO,
        },
        apply_data: ApplyData {
            eval_delta: EvalDelta {
                logs: vec![],
                inner_txns: children,
            },
            ..Default::default()
        },
    }
}

pub fn with_inners(mut stxn_ad: SignedTxnWithAd, children: Vec<SignedTxnWithAd>) -> SignedTxnWithAd {
    stxn_ad.apply_data.eval_delta.inner_txns = children;
    stxn_ad
}

/// Payset entry with the genesis fields elided, as blocks carry them.
pub fn in_block(stxn_ad: SignedTxnWithAd) -> SignedTxnInBlock {
    SignedTxnInBlock {
        stxn_ad,
        has_genesis_id: true,
        has_genesis_hash: true,
    }
}

pub fn make_block(round: u64, txn_counter: u64, payset: Vec<SignedTxnWithAd>) -> Block {
    Block {
        round,
        genesis_id: GENESIS_ID.to_string(),
        genesis_hash: [7u8; 32],
        txn_counter,
        fee_sink: make_address(250),
        rewards_pool: make_address(251),
        payset: payset.into_iter().map(in_block).collect(),
    }
}

pub fn funded(micro_algos: u64) -> AccountData {
    AccountData {
        micro_algos,
        rewards_base: 1,
        rewarded_micro_algos: 2,
        ..Default::default()
    }
}

/// Run the materializer to completion and collect everything it emitted.
pub async fn collect_rows(block: &Block) -> Result<Vec<TxnRow>> {
    let (sender, mut receiver) = mpsc::channel(1024);
    yield_transactions(&CancellationToken::new(), block, &[], sender).await?;

    let mut rows = Vec::new();
    while let Some(row) = receiver.recv().await {
        rows.push(row);
    }
    Ok(rows)
}

/// Pool on a WAL database file under `dir` that gives up on a held write
/// lock after `busy_timeout` instead of sqlx's default of several seconds.
pub async fn file_backed_pool(dir: &Path, busy_timeout: Duration) -> (SqlitePool, String) {
    let url = format!("sqlite://{}", dir.join("ledger.db").display());
    let options = SqliteConnectOptions::from_str(&url)
        .expect("valid sqlite url")
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .expect("Failed to open database file");
    run_migrations(&pool).await.expect("Failed to create schema");
    (pool, url)
}

/// A second connection holding the database write lock until it commits.
pub async fn hold_write_lock(url: &str) -> SqliteConnection {
    let mut conn = SqliteConnection::connect(url)
        .await
        .expect("Failed to open second connection");
    sqlx::query("BEGIN IMMEDIATE")
        .execute(&mut conn)
        .await
        .expect("Failed to take write lock");
    conn
}
