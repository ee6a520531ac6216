// Read access to the account and resource tables.

use crate::blockchain::sigtype::SigType;
use crate::db::{db_int, from_db_int};
use crate::encoding::{decode_trimmed_account_data, untrim_account_data, TrimmedAccountData};
use crate::error::{IndexerError, Result};
use crate::models::{AccountData, Address, AppLocalState, AppParams, AssetParams};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite};

#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub addr: Address,
    pub microalgos: u64,
    pub rewardsbase: u64,
    pub rewards_total: u64,
    pub deleted: bool,
    pub keytype: Option<SigType>,
    /// `None` on tombstoned accounts.
    pub account_data: Option<TrimmedAccountData>,
}

impl AccountRow {
    pub fn full_account_data(&self) -> Option<AccountData> {
        self.account_data.clone().map(|trimmed| {
            untrim_account_data(trimmed, self.microalgos, self.rewardsbase, self.rewards_total)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetRow {
    pub id: u64,
    pub creator: Address,
    pub params: Option<AssetParams>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingRow {
    pub addr: Address,
    pub asset_id: u64,
    pub amount: u64,
    pub frozen: bool,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppRow {
    pub id: u64,
    pub creator: Address,
    pub params: Option<AppParams>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalStateRow {
    pub addr: Address,
    pub app_id: u64,
    pub local_state: Option<AppLocalState>,
    pub deleted: bool,
}

pub(crate) fn decode_address(bytes: &[u8]) -> Result<Address> {
    Address::from_slice(bytes)
        .ok_or_else(|| IndexerError::Decode(format!("address of {} bytes", bytes.len())))
}

fn decode_blob<T: DeserializeOwned>(what: &str, blob: &str) -> Result<Option<T>> {
    serde_json::from_str(blob).map_err(|e| IndexerError::Decode(format!("{}: {}", what, e)))
}

fn account_from_row(row: &SqliteRow) -> Result<AccountRow> {
    let keytype = row
        .get::<Option<String>, _>("keytype")
        .map(|k| {
            SigType::parse(&k).ok_or_else(|| IndexerError::Decode(format!("keytype {:?}", k)))
        })
        .transpose()?;

    Ok(AccountRow {
        addr: decode_address(&row.get::<Vec<u8>, _>("addr"))?,
        microalgos: from_db_int(row.get("microalgos")),
        rewardsbase: from_db_int(row.get("rewardsbase")),
        rewards_total: from_db_int(row.get("rewards_total")),
        deleted: row.get("deleted"),
        keytype,
        account_data: decode_trimmed_account_data(&row.get::<String, _>("account_data"))?,
    })
}

pub async fn get_account<'e, E>(executor: E, addr: &Address) -> Result<Option<AccountRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT addr, microalgos, rewardsbase, rewards_total, deleted, keytype, account_data
         FROM account WHERE addr = ?",
    )
    .bind(addr.as_bytes().to_vec())
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(account_from_row).transpose()
}

pub async fn get_asset<'e, E>(executor: E, id: u64) -> Result<Option<AssetRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, creator_addr, params, deleted FROM asset WHERE id = ?")
        .bind(db_int(id))
        .fetch_optional(executor)
        .await?;

    row.map(|row| {
        Ok(AssetRow {
            id: from_db_int(row.get("id")),
            creator: decode_address(&row.get::<Vec<u8>, _>("creator_addr"))?,
            params: decode_blob("asset params", &row.get::<String, _>("params"))?,
            deleted: row.get("deleted"),
        })
    })
    .transpose()
}

pub async fn get_account_asset<'e, E>(
    executor: E,
    addr: &Address,
    asset_id: u64,
) -> Result<Option<HoldingRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT addr, assetid, amount, frozen, deleted FROM account_asset
         WHERE addr = ? AND assetid = ?",
    )
    .bind(addr.as_bytes().to_vec())
    .bind(db_int(asset_id))
    .fetch_optional(executor)
    .await?;

    row.map(|row| {
        let amount: String = row.get("amount");
        Ok(HoldingRow {
            addr: decode_address(&row.get::<Vec<u8>, _>("addr"))?,
            asset_id: from_db_int(row.get("assetid")),
            amount: amount
                .parse()
                .map_err(|_| IndexerError::Decode(format!("holding amount {:?}", amount)))?,
            frozen: row.get("frozen"),
            deleted: row.get("deleted"),
        })
    })
    .transpose()
}

pub async fn get_app<'e, E>(executor: E, id: u64) -> Result<Option<AppRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query("SELECT id, creator, params, deleted FROM app WHERE id = ?")
        .bind(db_int(id))
        .fetch_optional(executor)
        .await?;

    row.map(|row| {
        Ok(AppRow {
            id: from_db_int(row.get("id")),
            creator: decode_address(&row.get::<Vec<u8>, _>("creator"))?,
            params: decode_blob("app params", &row.get::<String, _>("params"))?,
            deleted: row.get("deleted"),
        })
    })
    .transpose()
}

pub async fn get_account_app<'e, E>(
    executor: E,
    addr: &Address,
    app_id: u64,
) -> Result<Option<LocalStateRow>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT addr, app, localstate, deleted FROM account_app WHERE addr = ? AND app = ?",
    )
    .bind(addr.as_bytes().to_vec())
    .bind(db_int(app_id))
    .fetch_optional(executor)
    .await?;

    row.map(|row| {
        Ok(LocalStateRow {
            addr: decode_address(&row.get::<Vec<u8>, _>("addr"))?,
            app_id: from_db_int(row.get("app")),
            local_state: decode_blob("local state", &row.get::<String, _>("localstate"))?,
            deleted: row.get("deleted"),
        })
    })
    .transpose()
}

pub async fn get_metastate<'e, E>(executor: E, key: &str) -> Result<Option<String>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let value = sqlx::query_scalar::<_, String>("SELECT v FROM metastate WHERE k = ?")
        .bind(key)
        .fetch_optional(executor)
        .await?;

    Ok(value)
}
