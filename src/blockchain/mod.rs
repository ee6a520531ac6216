pub mod materializer;
pub mod participation;
pub mod processor;
pub mod sigtype;
pub mod writer;

// Re-exports for convenience
pub use materializer::{transaction_asset_id, yield_transactions, TxnRow};
pub use processor::process_block;
pub use writer::Writer;
