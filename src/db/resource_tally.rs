//! Recomputes the per-account resource counters from the resource tables.
//!
//! The counters written by the block writer come from the ledger's delta and
//! are best-effort; after this migration has run they equal the number of
//! non-deleted `account_asset`, `asset`, `app` and `account_app` rows for each
//! address.

use crate::db::account::decode_address;
use crate::encoding::{decode_trimmed_account_data, encode_trimmed_account_data};
use crate::error::{IndexerError, Result};
use crate::models::Address;
use backon::{ExponentialBuilder, Retryable};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceCounts {
    pub assets: u64,
    pub asset_params: u64,
    pub app_params: u64,
    pub app_local_states: u64,
}

async fn count(conn: &mut SqliteConnection, sql: &'static str, addr: &Address) -> Result<u64> {
    let n = sqlx::query_scalar::<_, i64>(sql)
        .bind(addr.as_bytes().to_vec())
        .fetch_one(&mut *conn)
        .await
        .map_err(IndexerError::from_store)?;
    Ok(n as u64)
}

pub async fn count_resources(conn: &mut SqliteConnection, addr: &Address) -> Result<ResourceCounts> {
    Ok(ResourceCounts {
        assets: count(
            conn,
            "SELECT COUNT(*) FROM account_asset WHERE addr = ? AND NOT deleted",
            addr,
        )
        .await?,
        asset_params: count(
            conn,
            "SELECT COUNT(*) FROM asset WHERE creator_addr = ? AND NOT deleted",
            addr,
        )
        .await?,
        app_params: count(
            conn,
            "SELECT COUNT(*) FROM app WHERE creator = ? AND NOT deleted",
            addr,
        )
        .await?,
        app_local_states: count(
            conn,
            "SELECT COUNT(*) FROM account_app WHERE addr = ? AND NOT deleted",
            addr,
        )
        .await?,
    })
}

/// Migrate up to `limit` accounts with addresses strictly after `after`
/// (from the start when `None`). Returns the cursor for the next page, or
/// `None` once the table is exhausted.
///
/// Deleted accounts hold no account data; they are skipped but still advance
/// the cursor.
pub async fn migrate_page(
    conn: &mut SqliteConnection,
    after: Option<&Address>,
    limit: u32,
) -> Result<Option<Address>> {
    let after = after.map(|a| a.as_bytes().to_vec()).unwrap_or_default();
    let rows = sqlx::query(
        "SELECT addr, account_data FROM account WHERE addr > ? ORDER BY addr LIMIT ?",
    )
    .bind(after)
    .bind(i64::from(limit))
    .fetch_all(&mut *conn)
    .await
    .map_err(IndexerError::from_store)?;

    let mut last = None;
    let mut migrated = 0;

    for row in &rows {
        let addr = decode_address(&row.get::<Vec<u8>, _>("addr"))?;
        last = Some(addr);

        let Some(mut data) = decode_trimmed_account_data(&row.get::<String, _>("account_data"))?
        else {
            debug!("Skipping deleted account {}", addr);
            continue;
        };

        let counts = count_resources(conn, &addr).await?;
        data.total_assets = counts.assets;
        data.total_asset_params = counts.asset_params;
        data.total_app_params = counts.app_params;
        data.total_app_local_states = counts.app_local_states;

        sqlx::query("UPDATE account SET account_data = ? WHERE addr = ?")
            .bind(encode_trimmed_account_data(&data)?)
            .bind(addr.as_bytes().to_vec())
            .execute(&mut *conn)
            .await
            .map_err(IndexerError::from_store)?;
        migrated += 1;
    }

    info!(
        "Resource tally page: {} accounts read, {} migrated",
        rows.len(),
        migrated
    );

    if rows.len() < limit as usize {
        Ok(None)
    } else {
        Ok(last)
    }
}

/// Migrate every account, `batch_size` accounts per page, on the caller's
/// connection. Run it inside one transaction so the whole pass commits or
/// fails as a unit.
pub async fn run_migration(conn: &mut SqliteConnection, batch_size: u32) -> Result<()> {
    let batch_size = batch_size.max(1);
    let mut cursor = None;

    loop {
        cursor = migrate_page(conn, cursor.as_ref(), batch_size).await?;
        if cursor.is_none() {
            break;
        }
    }

    Ok(())
}

/// Run the full migration in its own transaction, retrying the whole
/// transaction when the store reports a conflict with a concurrent writer.
pub async fn run_migration_with_retry(
    pool: &SqlitePool,
    batch_size: u32,
    max_retries: usize,
) -> Result<()> {
    let attempt = || async move {
        let mut tx = pool.begin().await.map_err(IndexerError::from_store)?;
        run_migration(&mut *tx, batch_size).await?;
        tx.commit().await.map_err(IndexerError::from_store)?;
        Ok::<(), IndexerError>(())
    };

    attempt
        .retry(ExponentialBuilder::default().with_max_times(max_retries))
        .when(IndexerError::is_retryable)
        .notify(|err: &IndexerError, dur| {
            warn!("Resource tally migration conflicted, retrying in {:?}: {}", dur, err);
        })
        .await
}
