// Configuration for the ingestion engine:
// - Database connection string
// - Transaction row channel capacity
// - Resource tally migration page size and retry budget
// - Which applications get their params persisted
// - Which state keys are copied into their own columns

use crate::encoding::approval_hash;
use crate::models::{AppParams, KeyValue, TealValue};
use crate::validation::{validate_approval_hash, validate_batch_size, ValidationError};
use dotenv::dotenv;
use std::collections::HashSet;
use std::env;

/// Policy deciding which applications have their params rows persisted.
/// Local states are always persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AppFilter {
    #[default]
    All,
    /// Only apps whose approval program hashes (see [`approval_hash`]) to one of these.
    ApprovalHashes(HashSet<String>),
}

impl AppFilter {
    pub fn allows(&self, params: &AppParams) -> bool {
        match self {
            AppFilter::All => true,
            AppFilter::ApprovalHashes(hashes) => {
                hashes.contains(&approval_hash(&params.approval_program))
            }
        }
    }

    /// Parse a comma-separated list of base58 hashes. An empty list means all apps.
    pub fn parse(list: &str) -> Result<Self, ValidationError> {
        let mut hashes = HashSet::new();
        for hash in list.split(',').map(str::trim).filter(|h| !h.is_empty()) {
            validate_approval_hash(hash)?;
            hashes.insert(hash.to_string());
        }

        if hashes.is_empty() {
            Ok(AppFilter::All)
        } else {
            Ok(AppFilter::ApprovalHashes(hashes))
        }
    }
}

/// State keys copied out of app global state and account local state into
/// dedicated columns (`app.dao_name`, `app.asset_id`,
/// `account_app.voting_start`, `account_app.voting_end`). An empty key
/// disables its column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateProjection {
    pub dao_name_key: String,
    pub gov_token_key: String,
    pub voting_start_key: String,
    pub voting_end_key: String,
}

impl Default for StateProjection {
    fn default() -> Self {
        Self {
            dao_name_key: "dao_name".to_string(),
            gov_token_key: "gov_token_id".to_string(),
            voting_start_key: "voting_start".to_string(),
            voting_end_key: "voting_end".to_string(),
        }
    }
}

fn bytes_at(state: &KeyValue, key: &str) -> Option<Vec<u8>> {
    match state.get(key) {
        Some(TealValue::Bytes(b)) if !key.is_empty() => Some(b.clone()),
        _ => None,
    }
}

fn uint_at(state: &KeyValue, key: &str) -> Option<u64> {
    match state.get(key) {
        Some(TealValue::Uint(v)) if !key.is_empty() => Some(*v),
        _ => None,
    }
}

impl StateProjection {
    /// `dao_name` from global state. Missing or non-bytes values give `None`.
    pub fn dao_name(&self, global_state: &KeyValue) -> Option<Vec<u8>> {
        bytes_at(global_state, &self.dao_name_key)
    }

    pub fn gov_token(&self, global_state: &KeyValue) -> Option<u64> {
        uint_at(global_state, &self.gov_token_key)
    }

    /// `(voting_start, voting_end)` from an account's local state.
    pub fn voting_window(&self, local_state: &KeyValue) -> (Option<u64>, Option<u64>) {
        (
            uint_at(local_state, &self.voting_start_key),
            uint_at(local_state, &self.voting_end_key),
        )
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub txn_channel_capacity: usize,
    pub migration_batch_size: u32,
    pub migration_max_retries: usize,
    pub app_filter: AppFilter,
    pub state_projection: StateProjection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:indexer.db".to_string(),
            txn_channel_capacity: 64,
            migration_batch_size: 1000,
            migration_max_retries: 5,
            app_filter: AppFilter::All,
            state_projection: StateProjection::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ValidationError> {
        dotenv().ok();
        let defaults = Config::default();

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);
        let txn_channel_capacity = env::var("TXN_CHANNEL_CAPACITY")
            .map(|v| v.parse().unwrap_or(defaults.txn_channel_capacity))
            .unwrap_or(defaults.txn_channel_capacity)
            .max(1);
        let migration_batch_size = env::var("MIGRATION_BATCH_SIZE")
            .map(|v| v.parse().unwrap_or(defaults.migration_batch_size))
            .unwrap_or(defaults.migration_batch_size);
        let migration_max_retries = env::var("MIGRATION_MAX_RETRIES")
            .map(|v| v.parse().unwrap_or(defaults.migration_max_retries))
            .unwrap_or(defaults.migration_max_retries);
        let app_filter = match env::var("APP_APPROVAL_ALLOW_LIST") {
            Ok(list) => AppFilter::parse(&list)?,
            Err(_) => AppFilter::All,
        };

        let projection_defaults = defaults.state_projection;
        let state_projection = StateProjection {
            dao_name_key: env::var("DAO_NAME_KEY").unwrap_or(projection_defaults.dao_name_key),
            gov_token_key: env::var("GOV_TOKEN_KEY").unwrap_or(projection_defaults.gov_token_key),
            voting_start_key: env::var("VOTING_START_KEY")
                .unwrap_or(projection_defaults.voting_start_key),
            voting_end_key: env::var("VOTING_END_KEY").unwrap_or(projection_defaults.voting_end_key),
        };

        Ok(Self {
            database_url,
            txn_channel_capacity,
            migration_batch_size: validate_batch_size("MIGRATION_BATCH_SIZE", migration_batch_size)?,
            migration_max_retries,
            app_filter,
            state_projection,
        })
    }
}
