//! Delta Writer: turns one block's state delta into a single batch of
//! idempotent upserts.
//!
//! Every statement is `INSERT ... ON CONFLICT DO UPDATE` keyed on a natural
//! key, so replaying a block over rows it already wrote leaves them unchanged.
//! Deletions are soft: the row stays with `deleted = TRUE`.

use crate::blockchain::sigtype::{sig_type_deltas, SigTypeDelta};
use crate::config::{AppFilter, StateProjection};
use crate::db::{db_int, ACCOUNT_TOTALS_KEY, SPECIAL_ACCOUNTS_KEY};
use crate::encoding::{
    encode_account_totals, encode_app_local_state, encode_app_params, encode_asset_params,
    encode_special_addresses, encode_trimmed_account_data, trim_account_data,
};
use crate::error::{IndexerError, Result};
use crate::models::{
    AccountData, AccountDeltas, Address, AppResourceRecord, AssetResourceRecord, Block, Round,
    StateDelta,
};
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqliteConnection};
use std::collections::HashMap;
use tracing::debug;

type SqliteQuery = Query<'static, Sqlite, SqliteArguments<'static>>;

/// The writer's statement table. sqlx prepares each statement once per
/// connection and keeps it in that connection's statement cache, so the
/// prepared handles live exactly as long as the connection owning the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    SetSpecialAccounts,
    UpsertAsset,
    UpsertAccountAsset,
    UpsertApp,
    UpsertAccountApp,
    DeleteAccount,
    DeleteAccountUpdateKeytype,
    UpsertAccount,
    UpsertAccountWithKeytype,
    DeleteAsset,
    DeleteAccountAsset,
    DeleteApp,
    DeleteExistingApp,
    DeleteAccountApp,
    UpdateAccountTotals,
}

impl Statement {
    pub fn name(&self) -> &'static str {
        match self {
            Statement::SetSpecialAccounts => "set_special_accounts",
            Statement::UpsertAsset => "upsert_asset",
            Statement::UpsertAccountAsset => "upsert_account_asset",
            Statement::UpsertApp => "upsert_app",
            Statement::UpsertAccountApp => "upsert_account_app",
            Statement::DeleteAccount => "delete_account",
            Statement::DeleteAccountUpdateKeytype => "delete_account_update_keytype",
            Statement::UpsertAccount => "upsert_account",
            Statement::UpsertAccountWithKeytype => "upsert_account_with_keytype",
            Statement::DeleteAsset => "delete_asset",
            Statement::DeleteAccountAsset => "delete_account_asset",
            Statement::DeleteApp => "delete_app",
            Statement::DeleteExistingApp => "delete_existing_app",
            Statement::DeleteAccountApp => "delete_account_app",
            Statement::UpdateAccountTotals => "update_account_totals",
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Statement::SetSpecialAccounts => {
                "INSERT INTO metastate (k, v) VALUES (?1, ?2)
                 ON CONFLICT (k) DO UPDATE SET v = excluded.v"
            }
            Statement::UpsertAsset => {
                "INSERT INTO asset (id, creator_addr, params, deleted)
                 VALUES (?1, ?2, ?3, FALSE) ON CONFLICT (id) DO UPDATE SET
                 creator_addr = excluded.creator_addr, params = excluded.params, deleted = FALSE"
            }
            Statement::UpsertAccountAsset => {
                "INSERT INTO account_asset (addr, assetid, amount, frozen, deleted)
                 VALUES (?1, ?2, ?3, ?4, FALSE) ON CONFLICT (addr, assetid) DO UPDATE SET
                 amount = excluded.amount, frozen = excluded.frozen, deleted = FALSE"
            }
            Statement::UpsertApp => {
                "INSERT INTO app (id, creator, params, dao_name, asset_id, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, FALSE) ON CONFLICT (id) DO UPDATE SET
                 creator = excluded.creator, params = excluded.params,
                 dao_name = excluded.dao_name, asset_id = excluded.asset_id, deleted = FALSE"
            }
            Statement::UpsertAccountApp => {
                "INSERT INTO account_app (addr, app, localstate, voting_start, voting_end, deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, FALSE) ON CONFLICT (addr, app) DO UPDATE SET
                 localstate = excluded.localstate, voting_start = excluded.voting_start,
                 voting_end = excluded.voting_end, deleted = FALSE"
            }
            Statement::DeleteAccount => {
                "INSERT INTO account
                 (addr, microalgos, rewardsbase, rewards_total, deleted, account_data)
                 VALUES (?1, 0, 0, 0, TRUE, 'null') ON CONFLICT (addr) DO UPDATE SET
                 microalgos = excluded.microalgos, rewardsbase = excluded.rewardsbase,
                 rewards_total = excluded.rewards_total, deleted = TRUE,
                 account_data = excluded.account_data"
            }
            Statement::DeleteAccountUpdateKeytype => {
                "INSERT INTO account
                 (addr, microalgos, rewardsbase, rewards_total, deleted, keytype, account_data)
                 VALUES (?1, 0, 0, 0, TRUE, ?2, 'null') ON CONFLICT (addr) DO UPDATE SET
                 microalgos = excluded.microalgos, rewardsbase = excluded.rewardsbase,
                 rewards_total = excluded.rewards_total, deleted = TRUE,
                 keytype = excluded.keytype, account_data = excluded.account_data"
            }
            Statement::UpsertAccount => {
                "INSERT INTO account
                 (addr, microalgos, rewardsbase, rewards_total, deleted, account_data)
                 VALUES (?1, ?2, ?3, ?4, FALSE, ?5) ON CONFLICT (addr) DO UPDATE SET
                 microalgos = excluded.microalgos, rewardsbase = excluded.rewardsbase,
                 rewards_total = excluded.rewards_total, deleted = FALSE,
                 account_data = excluded.account_data"
            }
            Statement::UpsertAccountWithKeytype => {
                "INSERT INTO account
                 (addr, microalgos, rewardsbase, rewards_total, deleted, keytype, account_data)
                 VALUES (?1, ?2, ?3, ?4, FALSE, ?5, ?6) ON CONFLICT (addr) DO UPDATE SET
                 microalgos = excluded.microalgos, rewardsbase = excluded.rewardsbase,
                 rewards_total = excluded.rewards_total, deleted = FALSE,
                 keytype = excluded.keytype, account_data = excluded.account_data"
            }
            Statement::DeleteAsset => {
                "INSERT INTO asset (id, creator_addr, params, deleted)
                 VALUES (?1, ?2, 'null', TRUE) ON CONFLICT (id) DO UPDATE SET
                 creator_addr = excluded.creator_addr, params = excluded.params, deleted = TRUE"
            }
            Statement::DeleteAccountAsset => {
                "INSERT INTO account_asset (addr, assetid, amount, frozen, deleted)
                 VALUES (?1, ?2, '0', FALSE, TRUE) ON CONFLICT (addr, assetid) DO UPDATE SET
                 amount = excluded.amount, frozen = excluded.frozen, deleted = TRUE"
            }
            Statement::DeleteApp => {
                "INSERT INTO app (id, creator, params, dao_name, asset_id, deleted)
                 VALUES (?1, ?2, 'null', NULL, NULL, TRUE) ON CONFLICT (id) DO UPDATE SET
                 creator = excluded.creator, params = excluded.params,
                 dao_name = NULL, asset_id = NULL, deleted = TRUE"
            }
            // Only touches apps that already have a row.
            Statement::DeleteExistingApp => {
                "UPDATE app SET params = 'null', dao_name = NULL, asset_id = NULL, deleted = TRUE
                 WHERE id = ?1"
            }
            Statement::DeleteAccountApp => {
                "INSERT INTO account_app (addr, app, localstate, voting_start, voting_end, deleted)
                 VALUES (?1, ?2, 'null', NULL, NULL, TRUE) ON CONFLICT (addr, app) DO UPDATE SET
                 localstate = excluded.localstate, voting_start = NULL, voting_end = NULL,
                 deleted = TRUE"
            }
            Statement::UpdateAccountTotals => {
                "INSERT INTO metastate (k, v) VALUES (?1, ?2)
                 ON CONFLICT (k) DO UPDATE SET v = excluded.v"
            }
        }
    }

    fn query(&self) -> SqliteQuery {
        sqlx::query(self.sql())
    }
}

/// Logical step of a block write, reported when a statement fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SpecialAccounts,
    Accounts,
    AssetResources,
    AppResources,
    AccountTotals,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::SpecialAccounts => "special accounts",
            Step::Accounts => "accounts",
            Step::AssetResources => "asset resources",
            Step::AppResources => "app resources",
            Step::AccountTotals => "account totals",
        }
    }
}

struct Queued {
    step: Step,
    statement: Statement,
    query: SqliteQuery,
}

/// Statements for one round, submitted in the order they were queued.
pub struct Batch {
    round: Round,
    queued: Vec<Queued>,
}

impl Batch {
    pub fn new(round: Round) -> Self {
        Self {
            round,
            queued: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Queued statement names, in submission order.
    pub fn statements(&self) -> Vec<&'static str> {
        self.queued.iter().map(|q| q.statement.name()).collect()
    }

    fn queue(&mut self, step: Step, statement: Statement, bind: impl FnOnce(SqliteQuery) -> SqliteQuery) {
        self.queued.push(Queued {
            step,
            statement,
            query: bind(statement.query()),
        });
    }

    /// Execute every statement on `conn`, stopping at the first failure. The
    /// caller's transaction makes the batch all-or-nothing.
    pub async fn submit(self, conn: &mut SqliteConnection) -> Result<()> {
        let round = self.round;
        for Queued {
            step,
            statement,
            query,
        } in self.queued
        {
            query
                .execute(&mut *conn)
                .await
                .map_err(|source| IndexerError::StoreWrite {
                    round,
                    step: step.as_str(),
                    statement: statement.name(),
                    source,
                })?;
        }
        Ok(())
    }
}

fn addr_blob(addr: &Address) -> Vec<u8> {
    addr.as_bytes().to_vec()
}

fn set_special_accounts(block: &Block, batch: &mut Batch) -> Result<()> {
    let encoded = encode_special_addresses(&block.special_addresses())?;
    batch.queue(Step::SpecialAccounts, Statement::SetSpecialAccounts, |q| {
        q.bind(SPECIAL_ACCOUNTS_KEY).bind(encoded)
    });
    Ok(())
}

fn write_account(
    address: &Address,
    account_data: &AccountData,
    sigtype_delta: Option<SigTypeDelta>,
    batch: &mut Batch,
) -> Result<()> {
    let addr = addr_blob(address);
    let keytype = |delta: SigTypeDelta| delta.map(|s| s.as_str().to_string());

    if account_data.is_zero() {
        match sigtype_delta {
            Some(delta) => batch.queue(Step::Accounts, Statement::DeleteAccountUpdateKeytype, |q| {
                q.bind(addr).bind(keytype(delta))
            }),
            None => batch.queue(Step::Accounts, Statement::DeleteAccount, |q| q.bind(addr)),
        }
        return Ok(());
    }

    let trimmed = encode_trimmed_account_data(&trim_account_data(account_data))?;
    let microalgos = db_int(account_data.micro_algos);
    let rewards_base = db_int(account_data.rewards_base);
    let rewards_total = db_int(account_data.rewarded_micro_algos);

    match sigtype_delta {
        Some(delta) => batch.queue(Step::Accounts, Statement::UpsertAccountWithKeytype, |q| {
            q.bind(addr)
                .bind(microalgos)
                .bind(rewards_base)
                .bind(rewards_total)
                .bind(keytype(delta))
                .bind(trimmed)
        }),
        None => batch.queue(Step::Accounts, Statement::UpsertAccount, |q| {
            q.bind(addr)
                .bind(microalgos)
                .bind(rewards_base)
                .bind(rewards_total)
                .bind(trimmed)
        }),
    }
    Ok(())
}

fn write_asset_resource(resource: &AssetResourceRecord, batch: &mut Batch) -> Result<()> {
    let id = db_int(resource.aidx);

    if resource.params.deleted {
        let creator = addr_blob(&resource.addr);
        batch.queue(Step::AssetResources, Statement::DeleteAsset, |q| q.bind(id).bind(creator));
    } else if let Some(params) = &resource.params.params {
        let creator = addr_blob(&resource.addr);
        let encoded = encode_asset_params(params)?;
        batch.queue(Step::AssetResources, Statement::UpsertAsset, |q| {
            q.bind(id).bind(creator).bind(encoded)
        });
    }

    if resource.holding.deleted {
        let holder = addr_blob(&resource.addr);
        batch.queue(Step::AssetResources, Statement::DeleteAccountAsset, |q| q.bind(holder).bind(id));
    } else if let Some(holding) = &resource.holding.holding {
        let holder = addr_blob(&resource.addr);
        // TEXT keeps the full u64 range.
        let amount = holding.amount.to_string();
        let frozen = holding.frozen;
        batch.queue(Step::AssetResources, Statement::UpsertAccountAsset, |q| {
            q.bind(holder).bind(id).bind(amount).bind(frozen)
        });
    }

    Ok(())
}

fn write_app_resource(
    resource: &AppResourceRecord,
    app_filter: &AppFilter,
    projection: &StateProjection,
    batch: &mut Batch,
) -> Result<()> {
    let id = db_int(resource.aidx);

    // `None`: the delta carries no params to match the filter against.
    let params_allowed = match (&resource.params.params, app_filter) {
        (_, AppFilter::All) => Some(true),
        (Some(params), filter) => Some(filter.allows(params)),
        (None, _) => None,
    };

    if resource.params.deleted {
        match params_allowed {
            Some(true) => {
                let creator = addr_blob(&resource.addr);
                batch.queue(Step::AppResources, Statement::DeleteApp, |q| q.bind(id).bind(creator));
            }
            // Apps the filter rejected never got a row, so this only
            // reaches apps stored while they were allowed.
            None => batch.queue(Step::AppResources, Statement::DeleteExistingApp, |q| q.bind(id)),
            Some(false) => {}
        }
    } else if let (Some(params), Some(true)) = (&resource.params.params, params_allowed) {
        let creator = addr_blob(&resource.addr);
        let encoded = encode_app_params(params)?;
        let dao_name = projection.dao_name(&params.global_state);
        let gov_token = projection.gov_token(&params.global_state).map(db_int);
        batch.queue(Step::AppResources, Statement::UpsertApp, |q| {
            q.bind(id)
                .bind(creator)
                .bind(encoded)
                .bind(dao_name)
                .bind(gov_token)
        });
    }

    if resource.state.deleted {
        let holder = addr_blob(&resource.addr);
        batch.queue(Step::AppResources, Statement::DeleteAccountApp, |q| q.bind(holder).bind(id));
    } else if let Some(state) = &resource.state.local_state {
        let holder = addr_blob(&resource.addr);
        let encoded = encode_app_local_state(state)?;
        let (voting_start, voting_end) = projection.voting_window(&state.key_value);
        batch.queue(Step::AppResources, Statement::UpsertAccountApp, |q| {
            q.bind(holder)
                .bind(id)
                .bind(encoded)
                .bind(voting_start.map(db_int))
                .bind(voting_end.map(db_int))
        });
    }

    Ok(())
}

fn write_account_deltas(
    deltas: &AccountDeltas,
    sigtype_deltas: &HashMap<Address, SigTypeDelta>,
    app_filter: &AppFilter,
    projection: &StateProjection,
    batch: &mut Batch,
) -> Result<()> {
    for record in &deltas.accounts {
        let sigtype_delta = sigtype_deltas.get(&record.addr).copied();
        write_account(&record.addr, &record.data, sigtype_delta, batch)?;
    }

    for resource in &deltas.asset_resources {
        write_asset_resource(resource, batch)?;
    }

    for resource in &deltas.app_resources {
        write_app_resource(resource, app_filter, projection, batch)?;
    }

    Ok(())
}

/// Queue the statements for one round without touching the store.
pub fn build_block_batch(
    block: &Block,
    delta: &StateDelta,
    app_filter: &AppFilter,
    projection: &StateProjection,
) -> Result<Batch> {
    let mut batch = Batch::new(block.round);

    set_special_accounts(block, &mut batch)?;

    let sigtype_deltas = sig_type_deltas(&block.payset)?;
    write_account_deltas(&delta.accts, &sigtype_deltas, app_filter, projection, &mut batch)?;

    let totals = encode_account_totals(&delta.totals)?;
    batch.queue(Step::AccountTotals, Statement::UpdateAccountTotals, |q| {
        q.bind(ACCOUNT_TOTALS_KEY).bind(totals)
    });

    Ok(batch)
}

/// Writes blocks and their state deltas on a borrowed connection, normally
/// one inside an open transaction.
pub struct Writer<'c> {
    conn: &'c mut SqliteConnection,
    app_filter: &'c AppFilter,
    projection: &'c StateProjection,
}

impl<'c> Writer<'c> {
    pub fn new(
        conn: &'c mut SqliteConnection,
        app_filter: &'c AppFilter,
        projection: &'c StateProjection,
    ) -> Self {
        Self {
            conn,
            app_filter,
            projection,
        }
    }

    /// Genesis round: only the special addresses exist.
    pub async fn add_block0(&mut self, block: &Block) -> Result<()> {
        let mut batch = Batch::new(block.round);
        set_special_accounts(block, &mut batch)?;
        batch.submit(&mut *self.conn).await?;

        debug!(round = block.round, "wrote genesis special accounts");
        Ok(())
    }

    /// Write the block's state delta. Transactions are streamed separately,
    /// see [`crate::blockchain::materializer`].
    pub async fn add_block(&mut self, block: &Block, delta: &StateDelta) -> Result<()> {
        let batch = build_block_batch(block, delta, self.app_filter, self.projection)?;
        let statements = batch.len();
        batch.submit(&mut *self.conn).await?;

        debug!(
            round = block.round,
            statements,
            accounts = delta.accts.accounts.len(),
            "wrote block state delta"
        );
        Ok(())
    }
}
