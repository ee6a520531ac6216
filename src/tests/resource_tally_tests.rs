#[cfg(test)]
mod tests {
    use crate::db::resource_tally::{
        count_resources, migrate_page, run_migration, run_migration_with_retry, ResourceCounts,
    };
    use crate::db::{account, connection};
    use crate::encoding::{encode_trimmed_account_data, trim_account_data, NULL_BLOB};
    use crate::error::IndexerError;
    use crate::models::{AccountData, Address};
    use crate::tests::fixtures::*;
    use sqlx::SqlitePool;
    use std::time::{Duration, Instant};

    async fn setup() -> SqlitePool {
        connection::connect_in_memory()
            .await
            .expect("Failed to open in-memory database")
    }

    async fn insert_account(pool: &SqlitePool, addr: &Address, data: Option<&AccountData>) {
        let blob = match data {
            Some(data) => encode_trimmed_account_data(&trim_account_data(data)).unwrap(),
            None => NULL_BLOB.to_string(),
        };
        sqlx::query(
            "INSERT INTO account (addr, microalgos, rewardsbase, rewards_total, deleted, account_data)
             VALUES (?, ?, 0, 0, ?, ?)",
        )
        .bind(addr.as_bytes().to_vec())
        .bind(data.map(|d| d.micro_algos as i64).unwrap_or(0))
        .bind(data.is_none())
        .bind(blob)
        .execute(pool)
        .await
        .unwrap();
    }

    /// Resources with ids `from..to` for `addr`, every even id deleted.
    async fn insert_resources(pool: &SqlitePool, addr: &Address, from: i64, to: i64) {
        let addr = addr.as_bytes().to_vec();
        for i in from..to {
            let deleted = i % 2 == 0;
            sqlx::query(
                "INSERT INTO account_asset (addr, assetid, amount, frozen, deleted)
                 VALUES (?, ?, '0', FALSE, ?)",
            )
            .bind(&addr)
            .bind(i)
            .bind(deleted)
            .execute(pool)
            .await
            .unwrap();
            sqlx::query("INSERT INTO asset (id, creator_addr, params, deleted) VALUES (?, ?, '{}', ?)")
                .bind(i)
                .bind(&addr)
                .bind(deleted)
                .execute(pool)
                .await
                .unwrap();
            sqlx::query("INSERT INTO app (id, creator, params, deleted) VALUES (?, ?, '{}', ?)")
                .bind(i)
                .bind(&addr)
                .bind(deleted)
                .execute(pool)
                .await
                .unwrap();
            sqlx::query(
                "INSERT INTO account_app (addr, app, localstate, deleted) VALUES (?, ?, '{}', ?)",
            )
            .bind(&addr)
            .bind(i)
            .bind(deleted)
            .execute(pool)
            .await
            .unwrap();
        }
    }

    async fn stored_data(pool: &SqlitePool, addr: &Address) -> Option<AccountData> {
        account::get_account(pool, addr)
            .await
            .unwrap()
            .expect("account row")
            .full_account_data()
    }

    fn assert_counts(data: &AccountData, n: u64) {
        assert_eq!(data.total_assets, n);
        assert_eq!(data.total_asset_params, n);
        assert_eq!(data.total_app_params, n);
        assert_eq!(data.total_app_local_states, n);
    }

    #[tokio::test]
    async fn test_counts_skip_deleted_rows() {
        let pool = setup().await;
        let addr = make_address(1);
        insert_resources(&pool, &addr, 2, 10).await;

        let mut conn = pool.acquire().await.unwrap();
        let counts = count_resources(&mut *conn, &addr).await.unwrap();
        assert_eq!(
            counts,
            ResourceCounts {
                assets: 4,
                asset_params: 4,
                app_params: 4,
                app_local_states: 4,
            }
        );

        let empty = count_resources(&mut *conn, &make_address(2)).await.unwrap();
        assert_eq!(empty, ResourceCounts::default());
    }

    #[tokio::test]
    async fn test_migration_rewrites_counters() {
        let pool = setup().await;
        let addr = make_address(1);
        let closed = make_address(2);

        // Stale counters and unrelated fields that must survive.
        let data = AccountData {
            total_assets: 40,
            total_app_params: 1,
            total_extra_app_pages: 2,
            ..funded(1000)
        };
        insert_account(&pool, &addr, Some(&data)).await;
        insert_account(&pool, &closed, None).await;
        insert_resources(&pool, &addr, 2, 10).await;
        insert_resources(&pool, &closed, 20, 23).await;

        run_migration_with_retry(&pool, 1000, 3).await.unwrap();

        let migrated = stored_data(&pool, &addr).await.unwrap();
        assert_counts(&migrated, 4);
        assert_eq!(migrated.total_extra_app_pages, 2);
        assert_eq!(migrated.micro_algos, 1000);

        // Tombstones keep their null account data.
        assert_eq!(stored_data(&pool, &closed).await, None);
    }

    #[tokio::test]
    async fn test_migration_pages_through_all_accounts() {
        let pool = setup().await;

        // Account i holds i live resources of each kind.
        for i in 1..=14u8 {
            let addr = make_address(i);
            insert_account(&pool, &addr, Some(&funded(100))).await;
            let base = i64::from(i) * 100;
            insert_resources(&pool, &addr, base, base + 2 * i64::from(i)).await;
        }

        let mut tx = pool.begin().await.unwrap();
        run_migration(&mut *tx, 5).await.unwrap();
        tx.commit().await.unwrap();

        for i in 1..=14u8 {
            let data = stored_data(&pool, &make_address(i)).await.unwrap();
            assert_counts(&data, u64::from(i));
        }
    }

    #[tokio::test]
    async fn test_page_cursor() {
        let pool = setup().await;
        for i in 1..=7u8 {
            insert_account(&pool, &make_address(i), Some(&funded(1))).await;
        }

        let mut conn = pool.acquire().await.unwrap();
        let cursor = migrate_page(&mut *conn, None, 3).await.unwrap();
        assert_eq!(cursor, Some(make_address(3)));

        let cursor = migrate_page(&mut *conn, cursor.as_ref(), 3).await.unwrap();
        assert_eq!(cursor, Some(make_address(6)));

        // Short page: done.
        let cursor = migrate_page(&mut *conn, cursor.as_ref(), 3).await.unwrap();
        assert_eq!(cursor, None);
    }

    #[tokio::test]
    async fn test_page_cursor_advances_past_deleted_accounts() {
        let pool = setup().await;
        insert_account(&pool, &make_address(1), None).await;
        insert_account(&pool, &make_address(2), None).await;
        insert_account(&pool, &make_address(3), Some(&funded(1))).await;

        let mut conn = pool.acquire().await.unwrap();
        let cursor = migrate_page(&mut *conn, None, 2).await.unwrap();
        assert_eq!(cursor, Some(make_address(2)));

        let cursor = migrate_page(&mut *conn, cursor.as_ref(), 2).await.unwrap();
        assert_eq!(cursor, None);
    }

    #[tokio::test]
    async fn test_migration_on_empty_table() {
        let pool = setup().await;
        run_migration_with_retry(&pool, 10, 1).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(migrate_page(&mut *conn, None, 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_busy_store_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (pool, url) = file_backed_pool(dir.path(), Duration::from_millis(20)).await;
        insert_account(&pool, &make_address(1), Some(&funded(5))).await;

        let mut blocker = hold_write_lock(&url).await;
        let mut tx = pool.begin().await.unwrap();
        let err = run_migration(&mut *tx, 10).await.unwrap_err();
        assert!(matches!(err, IndexerError::SerializationConflict(_)));
        assert!(err.is_retryable());

        drop(tx);
        sqlx::query("COMMIT").execute(&mut blocker).await.unwrap();
    }

    #[tokio::test]
    async fn test_migration_retries_after_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let (pool, url) = file_backed_pool(dir.path(), Duration::from_millis(20)).await;
        let addr = make_address(1);
        insert_account(&pool, &addr, Some(&funded(5))).await;
        insert_resources(&pool, &addr, 2, 6).await;

        // The first attempt gives up after the busy timeout; the lock is gone
        // well before the backoff delay ends.
        let mut blocker = hold_write_lock(&url).await;
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            sqlx::query("COMMIT").execute(&mut blocker).await.unwrap();
        });

        run_migration_with_retry(&pool, 10, 3).await.unwrap();
        release.await.unwrap();

        assert_counts(&stored_data(&pool, &addr).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let (pool, _url) = file_backed_pool(dir.path(), Duration::from_millis(20)).await;
        insert_account(&pool, &make_address(1), Some(&funded(5))).await;
        sqlx::query("DROP TABLE account_asset").execute(&pool).await.unwrap();

        let started = Instant::now();
        let err = run_migration_with_retry(&pool, 10, 3).await.unwrap_err();
        assert!(matches!(err, IndexerError::Database(_)));
        assert!(!err.is_retryable());
        // No backoff delay was taken.
        assert!(started.elapsed() < Duration::from_millis(900));
    }
}
