// List filters for bank transactions
// Raw query-string parameters → typed tokens → named clauses → SQL / in-memory evaluation

pub mod composer;
pub mod params;
pub mod predicate;
pub mod query;

pub use composer::TransactionQueryComposer;
pub use params::{ListParams, SortColumn, SortSpec, Direction};
pub use predicate::{Clause, Predicate};
pub use query::{OrderBy, TransactionQuery};
