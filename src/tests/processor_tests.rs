#[cfg(test)]
mod tests {
    use crate::blockchain::process_block;
    use crate::config::Config;
    use crate::db::{account, connection, transaction, SPECIAL_ACCOUNTS_KEY};
    use crate::error::IndexerError;
    use crate::models::{AssetHolding, AssetResourceRecord, BalanceRecord, StateDelta, TxnType};
    use crate::tests::fixtures::*;
    use sqlx::SqlitePool;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    async fn setup() -> (SqlitePool, Config) {
        let pool = connection::connect_in_memory()
            .await
            .expect("Failed to open in-memory database");
        let config = Config {
            // Smaller than any round below so the writer applies backpressure.
            txn_channel_capacity: 2,
            ..Config::default()
        };
        (pool, config)
    }

    fn round_fixture() -> (crate::models::Block, StateDelta) {
        let alice = make_address(1);
        let bob = make_address(2);
        let app_account = make_address(3);

        let app = with_inners(
            signed(alice, app_call(40)),
            vec![
                inner(app_account, payment(bob, 10), vec![]),
                inner(app_account, asset_transfer(8, bob), vec![]),
            ],
        );
        let block = make_block(
            5,
            50,
            vec![signed(alice, payment(bob, 1_000)), app, signed(bob, asset_config(0))],
        );

        let mut delta = StateDelta::default();
        delta.accts.accounts = vec![
            BalanceRecord {
                addr: alice,
                data: funded(1_000_000),
            },
            BalanceRecord {
                addr: bob,
                data: funded(2_000),
            },
        ];
        delta.accts.asset_resources = vec![AssetResourceRecord {
            aidx: 8,
            addr: bob,
            params: Default::default(),
            holding: crate::models::AssetHoldingDelta {
                holding: Some(AssetHolding {
                    amount: 1,
                    frozen: false,
                }),
                deleted: false,
            },
        }];
        (block, delta)
    }

    #[tokio::test]
    async fn test_round_commits_state_and_transactions() {
        let (pool, config) = setup().await;
        let (block, delta) = round_fixture();

        process_block(&pool, &config, &block, &[], &delta, &CancellationToken::new())
            .await
            .unwrap();

        let stored = transaction::get_transactions(&pool, 5).await.unwrap();
        assert_eq!(stored.len(), 5);
        assert_eq!(
            stored.iter().map(|t| t.intra).collect::<Vec<_>>(),
            vec![0, 1, 2, 3, 4]
        );
        assert_eq!(stored[3].type_enum, TxnType::AssetTransfer as i32);
        assert_eq!(stored[3].asset, 8);
        assert_eq!(stored[3].extra.root_intra, Some(1));
        // Created asset: 50 - 3 + 4 + 1.
        assert_eq!(stored[4].asset, 52);
        assert!(stored[4].txid.is_some());

        let bob = make_address(2);
        assert_eq!(
            transaction::get_participation(&pool, &bob).await.unwrap(),
            vec![(5, 0), (5, 2), (5, 3), (5, 4)]
        );

        let row = account::get_account(&pool, &make_address(1)).await.unwrap().unwrap();
        assert_eq!(row.microalgos, 1_000_000);
        assert!(account::get_account_asset(&pool, &bob, 8).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_reprocessing_a_round_is_idempotent() {
        let (pool, config) = setup().await;
        let (block, delta) = round_fixture();
        let cancel = CancellationToken::new();

        process_block(&pool, &config, &block, &[], &delta, &cancel).await.unwrap();
        let first = transaction::get_transactions(&pool, 5).await.unwrap();
        process_block(&pool, &config, &block, &[], &delta, &cancel).await.unwrap();

        assert_eq!(transaction::get_transactions(&pool, 5).await.unwrap(), first);
        assert_eq!(transaction::count_transactions(&pool, 5).await.unwrap(), 5);
        assert_eq!(
            transaction::get_participation(&pool, &make_address(1)).await.unwrap(),
            vec![(5, 0), (5, 1)]
        );
    }

    #[tokio::test]
    async fn test_cancelled_round_commits_nothing() {
        let (pool, config) = setup().await;
        let (block, delta) = round_fixture();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = process_block(&pool, &config, &block, &[], &delta, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::Cancelled));

        assert_eq!(transaction::count_transactions(&pool, 5).await.unwrap(), 0);
        assert!(account::get_account(&pool, &make_address(1)).await.unwrap().is_none());
        assert_eq!(account::get_metastate(&pool, SPECIAL_ACCOUNTS_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_materializer_failure_rolls_back_state() {
        let (pool, config) = setup().await;
        let (mut block, delta) = round_fixture();
        // An inner creation without a recorded id can't be resolved.
        block.payset[1].stxn_ad.apply_data.eval_delta.inner_txns[0] =
            inner(make_address(3), app_call(0), vec![]);

        let err = process_block(&pool, &config, &block, &[], &delta, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::MissingCreatableId { .. }));

        assert_eq!(transaction::count_transactions(&pool, 5).await.unwrap(), 0);
        assert!(account::get_account(&pool, &make_address(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_genesis_round_writes_special_accounts() {
        let (pool, config) = setup().await;
        let block = make_block(0, 0, vec![]);

        process_block(
            &pool,
            &config,
            &block,
            &[],
            &StateDelta::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(account::get_metastate(&pool, SPECIAL_ACCOUNTS_KEY)
            .await
            .unwrap()
            .is_some());
        assert_eq!(transaction::count_transactions(&pool, 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_busy_transaction_insert_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (pool, url) = file_backed_pool(dir.path(), Duration::from_millis(20)).await;
        let (block, _) = round_fixture();
        let rows = collect_rows(&block).await.unwrap();

        let (out, receiver) = mpsc::channel(rows.len());
        for row in rows {
            out.send(row).await.unwrap();
        }
        drop(out);

        let mut blocker = hold_write_lock(&url).await;
        let mut tx = pool.begin().await.unwrap();
        let err = transaction::add_transactions(&mut *tx, receiver)
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::SerializationConflict(_)));

        drop(tx);
        sqlx::query("COMMIT").execute(&mut blocker).await.unwrap();
    }
}
