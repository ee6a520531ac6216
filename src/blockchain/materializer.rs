use crate::blockchain::participation::participants;
use crate::encoding::{encode_signed_txn_with_ad, encode_txn_extra, txn_id, TxnExtra};
use crate::error::{IndexerError, Result};
use crate::models::{Address, Block, Round, SignedTxnInBlock, SignedTxnWithAd, TxnKind, TxnType};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Inner transactions nested deeper than this are rejected. The protocol
/// allows far less; the cap only bounds the traversal stack.
pub const MAX_INNER_TXN_DEPTH: usize = 16;

/// One row of the `txn` table plus the addresses for `txn_participation`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnRow {
    pub round: Round,
    pub intra: u64,
    pub txn_type: TxnType,
    pub asset: u64,
    /// `None` for inner transactions; reach them through the root's row.
    pub txid: Option<String>,
    pub txn: Vec<u8>,
    pub extra: Vec<u8>,
    pub participants: Vec<Address>,
}

/// Id of the creatable referenced by a transaction, 0 when it references none.
///
/// Creation transactions from rounds that predate recorded creatable ids only
/// carry the id implicitly; it is derived from the block's transaction counter,
/// which requires `block`. Inner transactions always record their ids and must
/// be resolved without a block.
pub fn transaction_asset_id(
    stxn_ad: &SignedTxnWithAd,
    intra: u64,
    block: Option<&Block>,
) -> Result<u64> {
    let applied = &stxn_ad.apply_data;

    match &stxn_ad.txn().kind {
        TxnKind::ApplicationCall { application_id, .. } => resolve_creatable(
            *application_id,
            applied.application_id,
            "application",
            stxn_ad,
            intra,
            block,
        ),
        TxnKind::AssetConfig { config_asset, .. } => resolve_creatable(
            *config_asset,
            applied.config_asset,
            "asset",
            stxn_ad,
            intra,
            block,
        ),
        TxnKind::AssetTransfer { xfer_asset, .. } => Ok(*xfer_asset),
        TxnKind::AssetFreeze { freeze_asset, .. } => Ok(*freeze_asset),
        _ => Ok(0),
    }
}

fn resolve_creatable(
    explicit: u64,
    applied: u64,
    kind: &'static str,
    stxn_ad: &SignedTxnWithAd,
    intra: u64,
    block: Option<&Block>,
) -> Result<u64> {
    if explicit != 0 {
        return Ok(explicit);
    }
    if applied != 0 {
        return Ok(applied);
    }

    match block {
        // Those rounds have no inner transactions, so the offset is the payset position.
        Some(block) => block
            .txn_counter_at_start()
            .checked_add(intra)
            .and_then(|id| id.checked_add(1))
            .ok_or_else(|| {
                IndexerError::Decode(format!(
                    "round {}: {} id derived from txn counter {} overflows",
                    block.round, kind, block.txn_counter
                ))
            }),
        None => Err(IndexerError::MissingCreatableId {
            kind,
            txid: txn_id(stxn_ad.txn())?,
        }),
    }
}

async fn send_row(
    cancel: &CancellationToken,
    out: &mpsc::Sender<TxnRow>,
    row: TxnRow,
) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IndexerError::Cancelled),
        // A closed channel means the consumer gave up.
        res = out.send(row) => res.map_err(|_| IndexerError::Cancelled),
    }
}

/// Stream the rows for every transaction in `block`, inner transactions
/// included, in preorder. `modified_txns` holds the evaluator's enriched apply
/// data, parallel to the payset; when absent the block's own apply data is used.
///
/// Dropping `out` on return closes the channel for the consumer.
pub async fn yield_transactions(
    cancel: &CancellationToken,
    block: &Block,
    modified_txns: &[SignedTxnInBlock],
    out: mpsc::Sender<TxnRow>,
) -> Result<()> {
    let mut intra = 0u64;

    for (idx, stib) in block.payset.iter().enumerate() {
        let stxn_ad = block.decode_signed_txn(stib)?;
        let asset = transaction_asset_id(&stxn_ad, intra, Some(block))?;
        let txid = txn_id(stxn_ad.txn())?;

        let extra = TxnExtra {
            asset_close_amount: modified_txns
                .get(idx)
                .map(|m| m.stxn_ad.apply_data.asset_closing_amount)
                .unwrap_or(stxn_ad.apply_data.asset_closing_amount),
            root_intra: None,
            root_txid: None,
        };
        let row = TxnRow {
            round: block.round,
            intra,
            txn_type: stxn_ad.txn().kind.txn_type(),
            asset,
            txid: Some(txid.clone()),
            txn: encode_signed_txn_with_ad(&stxn_ad)?,
            extra: encode_txn_extra(&extra)?,
            participants: participants(&stxn_ad),
        };
        send_row(cancel, &out, row).await?;

        intra = yield_inner_transactions(cancel, block.round, &stxn_ad, intra + 1, intra, &txid, &out)
            .await?;
    }

    Ok(())
}

/// Preorder walk of `root`'s inner transaction tree starting at offset
/// `intra`. Returns the next free offset.
async fn yield_inner_transactions(
    cancel: &CancellationToken,
    round: Round,
    root: &SignedTxnWithAd,
    mut intra: u64,
    root_intra: u64,
    root_txid: &str,
    out: &mpsc::Sender<TxnRow>,
) -> Result<u64> {
    // One sibling iterator per nesting level.
    let mut stack = vec![root.inner_txns().iter()];

    while let Some(siblings) = stack.last_mut() {
        let Some(itxn) = siblings.next() else {
            stack.pop();
            continue;
        };

        let asset = transaction_asset_id(itxn, intra, None)?;
        let extra = TxnExtra {
            asset_close_amount: itxn.apply_data.asset_closing_amount,
            root_intra: Some(root_intra),
            root_txid: Some(root_txid.to_string()),
        };

        // Nested inner transactions get rows of their own.
        let mut flat = itxn.clone();
        flat.apply_data.eval_delta.inner_txns.clear();

        let row = TxnRow {
            round,
            intra,
            txn_type: itxn.txn().kind.txn_type(),
            asset,
            txid: None,
            txn: encode_signed_txn_with_ad(&flat)?,
            extra: encode_txn_extra(&extra)?,
            participants: participants(itxn),
        };
        send_row(cancel, out, row).await?;
        intra += 1;

        if !itxn.inner_txns().is_empty() {
            if stack.len() >= MAX_INNER_TXN_DEPTH {
                return Err(IndexerError::InnerTxnDepthExceeded {
                    round,
                    depth: MAX_INNER_TXN_DEPTH,
                });
            }
            stack.push(itxn.inner_txns().iter());
        }
    }

    Ok(intra)
}
