use ledger_sync::db::{account, connection, transaction};
use ledger_sync::models::{
    AccountData, Address, ApplyData, BalanceRecord, Block, SignedTxn, SignedTxnInBlock,
    SignedTxnWithAd, StateDelta, Transaction, TxnKind, TxnSignature,
};
use ledger_sync::{process_block, run_migration_with_retry, Config};
use tokio_util::sync::CancellationToken;

fn address(i: u8) -> Address {
    let mut bytes = [0u8; 32];
    bytes[0] = i;
    Address(bytes)
}

fn payment(sender: Address, receiver: Address, amount: u64) -> SignedTxnInBlock {
    SignedTxnInBlock {
        stxn_ad: SignedTxnWithAd {
            signed_txn: SignedTxn {
                txn: Transaction {
                    sender,
                    fee: 1000,
                    first_valid: 1,
                    last_valid: 1001,
                    note: vec![],
                    genesis_id: String::new(),
                    genesis_hash: [0u8; 32],
                    rekey_to: Address::ZERO,
                    kind: TxnKind::Payment {
                        receiver,
                        amount,
                        close_remainder_to: Address::ZERO,
                    },
                },
                signature: Some(TxnSignature::Sig(vec![1u8; 64])),
                auth_addr: Address::ZERO,
            },
            apply_data: ApplyData::default(),
        },
        has_genesis_id: true,
        has_genesis_hash: true,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Opening in-memory database...");
    let pool = connection::connect_in_memory().await?;
    println!("✅ Schema created");

    let config = Config::default();
    let cancel = CancellationToken::new();
    let (alice, bob) = (address(1), address(2));

    let genesis = Block {
        round: 0,
        genesis_id: "smoke-v1".to_string(),
        genesis_hash: [9u8; 32],
        txn_counter: 0,
        fee_sink: address(250),
        rewards_pool: address(251),
        payset: vec![],
    };
    process_block(&pool, &config, &genesis, &[], &StateDelta::default(), &cancel).await?;
    println!("✅ Genesis round committed");

    let block = Block {
        round: 1,
        txn_counter: 2,
        payset: vec![payment(alice, bob, 500), payment(bob, alice, 100)],
        ..genesis.clone()
    };
    let mut delta = StateDelta::default();
    for (addr, micro_algos) in [(alice, 9_600), (bob, 400)] {
        delta.accts.accounts.push(BalanceRecord {
            addr,
            data: AccountData {
                micro_algos,
                ..Default::default()
            },
        });
    }

    println!("Processing round {}...", block.round);
    process_block(&pool, &config, &block, &[], &delta, &cancel).await?;
    let stored = transaction::count_transactions(&pool, block.round).await?;
    println!("✅ Round {} stored {} transactions", block.round, stored);

    if stored != 2 {
        println!("❌ ERROR: expected 2 transactions in round {}", block.round);
        return Err("Transaction storage test failed".into());
    }

    for txn in transaction::get_transactions(&pool, block.round).await? {
        println!("  - intra {} txid {:?}", txn.intra, txn.txid);
    }

    run_migration_with_retry(&pool, config.migration_batch_size, config.migration_max_retries)
        .await?;
    println!("✅ Resource tally migration finished");

    match account::get_account(&pool, &alice).await? {
        Some(row) => println!("✅ {} holds {} microalgos ({:?})", alice, row.microalgos, row.keytype),
        None => {
            println!("❌ ERROR: account {} missing", alice);
            return Err("Account storage test failed".into());
        }
    }

    pool.close().await;
    println!("All tests completed successfully!");
    Ok(())
}
