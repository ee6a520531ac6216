use crate::blockchain::materializer::yield_transactions;
use crate::blockchain::writer::Writer;
use crate::config::Config;
use crate::db::transaction::add_transactions;
use crate::error::{IndexerError, Result};
use crate::models::{Block, SignedTxnInBlock, StateDelta};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Commit one round: the state delta and every transaction row land in a
/// single store transaction, or nothing does.
///
/// Rounds must be processed in order. On a store error the whole round can be
/// retried since every write is an upsert.
pub async fn process_block(
    pool: &SqlitePool,
    config: &Config,
    block: &Block,
    modified_txns: &[SignedTxnInBlock],
    delta: &StateDelta,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut tx = pool.begin().await.map_err(IndexerError::from_store)?;

    {
        let mut writer = Writer::new(&mut *tx, &config.app_filter, &config.state_projection);
        if block.round == 0 {
            writer.add_block0(block).await?;
        } else {
            writer.add_block(block, delta).await?;
        }
    }

    let (sender, receiver) = mpsc::channel(config.txn_channel_capacity);
    let producer = yield_transactions(cancel, block, modified_txns, sender);
    let consumer = add_transactions(&mut *tx, receiver);
    let ((), stored) = tokio::try_join!(producer, consumer)?;

    tx.commit().await.map_err(IndexerError::from_store)?;

    info!(
        "Committed round {} ({} transaction rows)",
        block.round, stored
    );
    Ok(())
}
