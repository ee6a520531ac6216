use crate::models::{Address, SignedTxnWithAd, TxnKind};

/// Addresses a transaction touches, in first-seen order, without duplicates
/// or the zero address. Inner transactions are not included; they get rows
/// of their own.
pub fn participants(stxn_ad: &SignedTxnWithAd) -> Vec<Address> {
    let txn = stxn_ad.txn();
    let mut out = Vec::with_capacity(4);
    let mut add = |addr: Address| {
        if !addr.is_zero() && !out.contains(&addr) {
            out.push(addr);
        }
    };

    add(txn.sender);
    match &txn.kind {
        TxnKind::Payment {
            receiver,
            close_remainder_to,
            ..
        } => {
            add(*receiver);
            add(*close_remainder_to);
        }
        TxnKind::AssetTransfer {
            asset_sender,
            asset_receiver,
            asset_close_to,
            ..
        } => {
            add(*asset_sender);
            add(*asset_receiver);
            add(*asset_close_to);
        }
        TxnKind::AssetFreeze { freeze_account, .. } => add(*freeze_account),
        _ => {}
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SignedTxn, Transaction};

    #[test]
    fn test_payment_participants_skip_zero_and_duplicates() {
        let sender = Address([1; 32]);
        let stxn_ad = SignedTxnWithAd {
            signed_txn: SignedTxn {
                txn: Transaction {
                    sender,
                    fee: 0,
                    first_valid: 0,
                    last_valid: 0,
                    note: vec![],
                    genesis_id: String::new(),
                    genesis_hash: [0; 32],
                    rekey_to: Address::ZERO,
                    kind: TxnKind::Payment {
                        receiver: sender,
                        amount: 1,
                        close_remainder_to: Address::ZERO,
                    },
                },
                signature: None,
                auth_addr: Address::ZERO,
            },
            apply_data: Default::default(),
        };

        assert_eq!(participants(&stxn_ad), vec![sender]);
    }
}
