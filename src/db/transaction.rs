use crate::blockchain::materializer::TxnRow;
use crate::db::{db_int, from_db_int};
use crate::encoding::{decode_signed_txn_with_ad, decode_txn_extra, TxnExtra};
use crate::error::{IndexerError, Result};
use crate::models::{Address, Round, SignedTxnWithAd};
use sqlx::{Executor, Row, Sqlite, SqliteConnection};
use tokio::sync::mpsc;
use tracing::debug;

/// Drain `rows` into the `txn` and `txn_participation` tables until the
/// producer closes the channel. Returns the number of transaction rows written.
///
/// Rows are keyed by (round, intra) and overwrite on conflict, so a retried
/// round rewrites the same rows.
pub async fn add_transactions(
    conn: &mut SqliteConnection,
    mut rows: mpsc::Receiver<TxnRow>,
) -> Result<usize> {
    let mut written = 0;

    while let Some(row) = rows.recv().await {
        sqlx::query(
            r#"
            INSERT INTO txn (round, intra, typeenum, asset, txid, txn, extra)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (round, intra) DO UPDATE SET
            typeenum = excluded.typeenum, asset = excluded.asset, txid = excluded.txid,
            txn = excluded.txn, extra = excluded.extra
            "#,
        )
        .bind(db_int(row.round))
        .bind(db_int(row.intra))
        .bind(row.txn_type as i32)
        .bind(db_int(row.asset))
        .bind(&row.txid)
        .bind(&row.txn)
        .bind(&row.extra)
        .execute(&mut *conn)
        .await
        .map_err(IndexerError::from_store)?;

        for addr in &row.participants {
            sqlx::query(
                "INSERT INTO txn_participation (addr, round, intra) VALUES (?, ?, ?)
                 ON CONFLICT (addr, round, intra) DO NOTHING",
            )
            .bind(addr.as_bytes())
            .bind(db_int(row.round))
            .bind(db_int(row.intra))
            .execute(&mut *conn)
            .await
            .map_err(IndexerError::from_store)?;
        }

        written += 1;
    }

    debug!("Stored {} transaction rows", written);
    Ok(written)
}

/// A stored transaction row, decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredTxn {
    pub round: Round,
    pub intra: u64,
    pub type_enum: i32,
    pub asset: u64,
    pub txid: Option<String>,
    pub txn: SignedTxnWithAd,
    pub extra: TxnExtra,
}

pub async fn get_transactions<'e, E>(executor: E, round: Round) -> Result<Vec<StoredTxn>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        r#"SELECT round, intra, typeenum, asset, txid, txn, extra
           FROM txn WHERE round = ?
           ORDER BY intra ASC"#,
    )
    .bind(db_int(round))
    .fetch_all(executor)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(StoredTxn {
                round: from_db_int(row.get("round")),
                intra: from_db_int(row.get("intra")),
                type_enum: row.get("typeenum"),
                asset: from_db_int(row.get("asset")),
                txid: row.get("txid"),
                txn: decode_signed_txn_with_ad(&row.get::<Vec<u8>, _>("txn"))?,
                extra: decode_txn_extra(&row.get::<Vec<u8>, _>("extra"))?,
            })
        })
        .collect()
}

/// (round, intra) of every transaction `addr` took part in, oldest first.
pub async fn get_participation<'e, E>(executor: E, addr: &Address) -> Result<Vec<(Round, u64)>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT round, intra FROM txn_participation WHERE addr = ? ORDER BY round, intra",
    )
    .bind(addr.as_bytes().to_vec())
    .fetch_all(executor)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (from_db_int(row.get("round")), from_db_int(row.get("intra"))))
        .collect())
}

pub async fn count_transactions<'e, E>(executor: E, round: Round) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query("SELECT COUNT(*) FROM txn WHERE round = ?")
        .bind(db_int(round))
        .fetch_one(executor)
        .await?
        .get::<i64, _>(0);

    Ok(count)
}
