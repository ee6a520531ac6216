pub mod account;
pub mod connection;
pub mod migration;
pub mod resource_tally;
pub mod transaction;

/// `metastate` key holding the fee sink and rewards pool.
pub const SPECIAL_ACCOUNTS_KEY: &str = "special_accounts";
/// `metastate` key holding the ledger-wide account totals.
pub const ACCOUNT_TOTALS_KEY: &str = "account_totals";

pub const INIT_SCHEMA: &str = r#"
-- Single-row aggregates keyed by name
CREATE TABLE IF NOT EXISTS metastate (
    k TEXT PRIMARY KEY,
    v TEXT NOT NULL
);

-- Accounts; closed accounts stay as tombstones
CREATE TABLE IF NOT EXISTS account (
    addr BLOB PRIMARY KEY,
    microalgos INTEGER NOT NULL,
    rewardsbase INTEGER NOT NULL,
    rewards_total INTEGER NOT NULL,
    deleted BOOLEAN NOT NULL,
    keytype TEXT,
    account_data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS asset (
    id INTEGER PRIMARY KEY,
    creator_addr BLOB NOT NULL,
    params TEXT NOT NULL,
    deleted BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS account_asset (
    addr BLOB NOT NULL,
    assetid INTEGER NOT NULL,
    amount TEXT NOT NULL,
    frozen BOOLEAN NOT NULL,
    deleted BOOLEAN NOT NULL,
    PRIMARY KEY (addr, assetid)
);

-- dao_name and asset_id are projected from global state
CREATE TABLE IF NOT EXISTS app (
    id INTEGER PRIMARY KEY,
    creator BLOB NOT NULL,
    params TEXT NOT NULL,
    dao_name BLOB,
    asset_id INTEGER,
    deleted BOOLEAN NOT NULL
);

CREATE TABLE IF NOT EXISTS account_app (
    addr BLOB NOT NULL,
    app INTEGER NOT NULL,
    localstate TEXT NOT NULL,
    voting_start INTEGER,
    voting_end INTEGER,
    deleted BOOLEAN NOT NULL,
    PRIMARY KEY (addr, app)
);

-- Transactions in preorder, inner transactions included
CREATE TABLE IF NOT EXISTS txn (
    round INTEGER NOT NULL,
    intra INTEGER NOT NULL,
    typeenum INTEGER NOT NULL,
    asset INTEGER NOT NULL,
    txid TEXT,
    txn BLOB NOT NULL,
    extra BLOB NOT NULL,
    PRIMARY KEY (round, intra)
);

CREATE TABLE IF NOT EXISTS txn_participation (
    addr BLOB NOT NULL,
    round INTEGER NOT NULL,
    intra INTEGER NOT NULL,
    PRIMARY KEY (addr, round, intra)
);

-- Indexes for the resource tally counts and txid lookups
CREATE INDEX IF NOT EXISTS idx_asset_creator ON asset(creator_addr);
CREATE INDEX IF NOT EXISTS idx_app_creator ON app(creator);
CREATE UNIQUE INDEX IF NOT EXISTS idx_txn_txid ON txn(txid) WHERE txid IS NOT NULL;
"#;

/// SQLite integers are signed 64-bit; ids and balances are stored bit-for-bit
/// and read back with [`from_db_int`].
pub(crate) fn db_int(value: u64) -> i64 {
    value as i64
}

pub(crate) fn from_db_int(value: i64) -> u64 {
    value as u64
}
