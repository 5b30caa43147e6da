pub mod amount;
pub mod core;
pub mod enrichment;
pub mod error;
pub mod holding;
pub mod holding_service;
pub mod market_data;
pub mod market_data_factory;
pub mod portfolio;
pub mod portfolio_service;
pub mod sort;
pub mod store;
pub mod transaction;
pub mod transaction_service;
pub mod trend;
pub mod user;
pub mod watchlist;
pub mod watchlist_service;

pub use database_adapter::db::{Repository, SortDirection};
pub use error::TrackerError;

#[cfg(test)]
mod tests;
