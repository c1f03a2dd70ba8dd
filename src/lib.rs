// Pet Ledger System - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod animals;
pub mod capability;
pub mod inventory;
pub mod registry;
pub mod loans;
pub mod lending;
pub mod db;

// Re-export commonly used types
pub use animals::{AnimalType, Gender, ALL_ANIMALS};
pub use capability::{permitted_mask, validate, CapabilityRow, CAPABILITY_TABLE};
pub use inventory::InventoryLedger;
pub use registry::{ProfileRegistry, UserProfile};
pub use loans::LoanBook;
pub use lending::{LendingEngine, LendingError, Notification};
pub use db::{
    derive_identity, get_admin, get_recent_events, insert_event, load_engine, load_stock_csv,
    persist_engine, read_stock_records, setup_database, store_admin, Event, StockRecord,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
