// 📦 Storage seam - where a composed query gets executed
//
// The composer only builds `TransactionQuery` values; a `TransactionSource`
// runs them. `SqliteStore` renders SQL, `MemoryStore` evaluates the same
// predicates in process.

use crate::db::{row_to_transaction, BankTransaction, SELECT_COLUMNS};
use crate::filters::{ListParams, TransactionQuery, TransactionQueryComposer};
use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};

/// Supplies the organization every query is scoped to
pub trait TenantScope {
    fn company_id(&self) -> &str;
}

/// A tenant known up front (CLI flag, config file, request header)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTenant {
    company_id: String,
}

impl FixedTenant {
    pub fn new(company_id: impl Into<String>) -> Self {
        FixedTenant {
            company_id: company_id.into(),
        }
    }
}

impl TenantScope for FixedTenant {
    fn company_id(&self) -> &str {
        &self.company_id
    }
}

pub trait TransactionSource {
    /// Every record satisfying `query`, in the query's order
    fn fetch(&self, query: &TransactionQuery) -> Result<Vec<BankTransaction>>;
}

// ============================================================================
// SQLITE
// ============================================================================

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        SqliteStore { conn }
    }

    /// The statement and bound values `fetch` would run
    pub fn to_sql(query: &TransactionQuery) -> (String, Vec<rusqlite::types::Value>) {
        let mut sql = format!("SELECT {} FROM bank_transactions", SELECT_COLUMNS);
        let mut values = Vec::new();

        if let Some((where_sql, where_values)) = query.where_sql() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            values = where_values;
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(&query.order_sql());

        (sql, values)
    }
}

impl TransactionSource for SqliteStore<'_> {
    fn fetch(&self, query: &TransactionQuery) -> Result<Vec<BankTransaction>> {
        let (sql, values) = Self::to_sql(query);
        tracing::debug!(%sql, bound = values.len(), "fetching bank transactions");

        let mut stmt = self
            .conn
            .prepare(&sql)
            .context("Failed to prepare bank transaction query")?;

        let transactions = stmt
            .query_map(params_from_iter(values.iter()), row_to_transaction)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }
}

// ============================================================================
// IN MEMORY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    transactions: Vec<BankTransaction>,
}

impl MemoryStore {
    pub fn new(transactions: Vec<BankTransaction>) -> Self {
        MemoryStore { transactions }
    }

    pub fn insert(&mut self, tx: BankTransaction) {
        self.transactions.push(tx);
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionSource for MemoryStore {
    fn fetch(&self, query: &TransactionQuery) -> Result<Vec<BankTransaction>> {
        let mut matched: Vec<BankTransaction> = self
            .transactions
            .iter()
            .filter(|tx| query.matches(tx))
            .cloned()
            .collect();

        query.sort(&mut matched);
        Ok(matched)
    }
}

/// Compose `params` for `scope` and run the query against `source`.
///
/// Filter errors come back as `FilterError` inside the `anyhow::Error`, so
/// callers can tell a bad parameter from a storage failure with `downcast_ref`.
pub fn list_transactions(
    source: &dyn TransactionSource,
    scope: &dyn TenantScope,
    params: &ListParams,
) -> Result<Vec<BankTransaction>> {
    let query = TransactionQueryComposer::for_tenant(scope)
        .apply(params)?
        .into_query();

    let transactions = source.fetch(&query)?;
    tracing::info!(
        company_id = scope.company_id(),
        clauses = query.clauses().len(),
        returned = transactions.len(),
        "listed bank transactions"
    );

    Ok(transactions)
}
