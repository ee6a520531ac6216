use crate::models::{Address, Round};
use thiserror::Error;

pub type Result<T, E = IndexerError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("missing {kind} id for transaction {txid}")]
    MissingCreatableId { kind: &'static str, txid: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transaction from {sender} carries no signature")]
    MissingSignature { sender: Address },

    #[error("round {round}: inner transactions nested deeper than {depth}")]
    InnerTxnDepthExceeded { round: Round, depth: usize },

    #[error("round {round}: {step} failed on statement {statement}: {source}")]
    StoreWrite {
        round: Round,
        step: &'static str,
        statement: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("serialization conflict: {0}")]
    SerializationConflict(#[source] sqlx::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl IndexerError {
    /// Whether retrying the whole store transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexerError::SerializationConflict(_))
    }

    /// Sort a raw store error into a conflict the caller may retry, or a plain
    /// database failure.
    pub fn from_store(err: sqlx::Error) -> Self {
        if is_conflict(&err) {
            IndexerError::SerializationConflict(err)
        } else {
            IndexerError::Database(err)
        }
    }
}

// SQLITE_BUSY, SQLITE_LOCKED and their extended codes (BUSY_RECOVERY,
// BUSY_SNAPSHOT, LOCKED_SHAREDCACHE).
const CONFLICT_CODES: &[&str] = &["5", "6", "261", "517", "262"];

fn is_conflict(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code()
                .map(|code| CONFLICT_CODES.contains(&code.as_ref()))
                .unwrap_or(false)
                || db.message().contains("database is locked")
        }
        _ => false,
    }
}
