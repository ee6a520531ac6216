pub mod blockchain;
pub mod config;
pub mod db;
pub mod encoding;
pub mod error;
pub mod models;
pub mod validation;

#[cfg(test)]
pub mod tests;

// Re-export specific items for convenience
pub use blockchain::{process_block, Writer};
pub use config::{AppFilter, Config, StateProjection};
pub use db::connection;
pub use db::resource_tally::{run_migration, run_migration_with_retry};
pub use error::{IndexerError, Result};
