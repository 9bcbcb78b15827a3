// Bank Ledger - Core Library
// Bank transaction storage, list filters, and report export for the CLI and API server

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod filters;
pub mod logging;
pub mod store;

// Re-export commonly used types
pub use db::{
    BankTransaction, BaseType, ImportSummary, TransactionStatus,
    get_transaction, insert_transactions, load_csv, open_database, read_csv, setup_database,
    verify_count,
};
pub use error::FilterError;
pub use export::{export_to_string, write_csv, EXPORT_FILENAME};
pub use filters::{
    Clause, Direction, ListParams, OrderBy, Predicate, SortColumn, SortSpec, TransactionQuery,
    TransactionQueryComposer,
};
pub use store::{
    list_transactions, FixedTenant, MemoryStore, SqliteStore, TenantScope, TransactionSource,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
