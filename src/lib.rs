pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod json_db;
pub mod scanner;
pub mod server;
pub mod stats;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{MarketData, UniversalisClient};
pub use config::Config;
pub use coordinator::{ScanCoordinator, ScanStatus};
pub use error::{Result, ScannerError};
pub use json_db::JsonStateStore;
pub use scanner::MarketScanner;
pub use storage::StateStore;
pub use types::{ItemSummary, Listing, SaleCount, ScanState};
