use crate::error::{IndexerError, Result};
use crate::models::{Address, SignedTxn, SignedTxnInBlock, TxnKind, TxnSignature};
use std::collections::HashMap;

/// How an account authorizes its transactions, stored in `account.keytype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigType {
    Sig,
    Msig,
    Lsig,
}

impl SigType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigType::Sig => "sig",
            SigType::Msig => "msig",
            SigType::Lsig => "lsig",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sig" => Some(SigType::Sig),
            "msig" => Some(SigType::Msig),
            "lsig" => Some(SigType::Lsig),
            _ => None,
        }
    }
}

pub fn signature_type(stxn: &SignedTxn) -> Result<SigType> {
    match &stxn.signature {
        Some(TxnSignature::Sig(_)) => Ok(SigType::Sig),
        Some(TxnSignature::Msig(_)) => Ok(SigType::Msig),
        Some(TxnSignature::Lsig(_)) => Ok(SigType::Lsig),
        None => Err(IndexerError::MissingSignature {
            sender: stxn.txn.sender,
        }),
    }
}

/// New `keytype` per sender. `None` resets the column: the key type can't be
/// known after a rekey, and state proofs carry no signature.
pub type SigTypeDelta = Option<SigType>;

pub fn sig_type_deltas(payset: &[SignedTxnInBlock]) -> Result<HashMap<Address, SigTypeDelta>> {
    let mut res = HashMap::with_capacity(payset.len());

    for stib in payset {
        let stxn = &stib.stxn_ad.signed_txn;
        let determinable = stxn.txn.rekey_to.is_zero()
            && !matches!(stxn.txn.kind, TxnKind::StateProof { .. });

        let delta = if determinable {
            Some(signature_type(stxn)?)
        } else {
            None
        };
        res.insert(stxn.txn.sender, delta);
    }

    Ok(res)
}
