// 🔤 List parameters - raw strings in, closed enumerations out
//
// Every parameter is parsed once at the boundary. Unknown legacy tokens are
// kept as an explicit `Ignored` variant rather than failing the parse, so
// stale UI values still produce a result.

use crate::db::{BankTransaction, BaseType, TransactionStatus};
use crate::error::FilterError;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The five list parameters as they arrive from a query string or CLI.
/// Every field defaults to the empty string, meaning "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub name: String,
    pub filter: String,
    pub client_status: String,
    pub status: String,
    pub sort: String,
}

/// Split a comma separated parameter into tokens.
/// Tokens are compared exactly: no trimming, no case folding.
pub fn split_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',')
}

// ============================================================================
// CLIENT STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientStatusToken {
    All,
    Status(TransactionStatus),
    Kind(BaseType),
    Ignored(String),
}

impl ClientStatusToken {
    pub fn parse(token: &str) -> Self {
        match token {
            "all" => ClientStatusToken::All,
            "unmatched" => ClientStatusToken::Status(TransactionStatus::Unmatched),
            "matched" => ClientStatusToken::Status(TransactionStatus::Matched),
            "converted" => ClientStatusToken::Status(TransactionStatus::Converted),
            "deposits" => ClientStatusToken::Kind(BaseType::Credit),
            "withdrawals" => ClientStatusToken::Kind(BaseType::Debit),
            other => ClientStatusToken::Ignored(other.to_string()),
        }
    }
}

// ============================================================================
// LIFECYCLE STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleToken {
    /// `deleted_at` unset
    Active,
    /// `deleted_at` set and not hard deleted
    Archived,
    /// `is_deleted` set
    Deleted,
    Ignored(String),
}

impl LifecycleToken {
    pub fn parse(token: &str) -> Self {
        match token {
            "active" => LifecycleToken::Active,
            "archived" => LifecycleToken::Archived,
            "deleted" => LifecycleToken::Deleted,
            other => LifecycleToken::Ignored(other.to_string()),
        }
    }
}

// ============================================================================
// SORT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }

    /// Apply this direction to an ascending comparison
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Asc => ordering,
            Direction::Desc => ordering.reverse(),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Direction {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(FilterError::InvalidArgument(format!(
                "sort direction must be asc or desc, got {:?}",
                s
            )))
        }
    }
}

/// Columns a caller may order by. Anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    Id,
    Date,
    Description,
    BankAccountName,
    Amount,
    BaseType,
    StatusId,
    DeletedAt,
}

impl SortColumn {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortColumn::Id),
            "date" => Some(SortColumn::Date),
            "description" => Some(SortColumn::Description),
            "bank_account_name" => Some(SortColumn::BankAccountName),
            "amount" => Some(SortColumn::Amount),
            "base_type" => Some(SortColumn::BaseType),
            "status_id" => Some(SortColumn::StatusId),
            "deleted_at" => Some(SortColumn::DeletedAt),
            _ => None,
        }
    }

    /// SQL expression the column orders by
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Id => "bank_transactions.id",
            SortColumn::Date => "bank_transactions.date",
            SortColumn::Description => "bank_transactions.description",
            SortColumn::BankAccountName => "bank_transactions.bank_account_name",
            // order-preserving text key, see `amount_sort_key`
            SortColumn::Amount => "bank_transactions.amount_key",
            SortColumn::BaseType => "bank_transactions.base_type",
            SortColumn::StatusId => "bank_transactions.status_id",
            SortColumn::DeletedAt => "bank_transactions.deleted_at",
        }
    }

    /// Ascending comparison matching SQLite's ordering of the stored column
    pub fn compare(&self, a: &BankTransaction, b: &BankTransaction) -> Ordering {
        match self {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::Date => a.date.cmp(&b.date),
            SortColumn::Description => a.description.cmp(&b.description),
            SortColumn::BankAccountName => a.bank_account_name.cmp(&b.bank_account_name),
            SortColumn::Amount => a.amount.cmp(&b.amount),
            SortColumn::BaseType => a.base_type.as_str().cmp(b.base_type.as_str()),
            SortColumn::StatusId => a.status.id().cmp(&b.status.id()),
            SortColumn::DeletedAt => a.deleted_at.cmp(&b.deleted_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// Credits only, ordered by amount
    Deposit,
    /// Debits only, ordered by amount
    Withdrawal,
    /// Relation keys (`invoices`, `expense`) that have no column to order by
    Unsupported(String),
    Column(SortColumn),
}

impl SortKey {
    pub fn parse(name: &str) -> Result<Self, FilterError> {
        match name {
            "deposit" => Ok(SortKey::Deposit),
            "withdrawal" => Ok(SortKey::Withdrawal),
            "status" => Ok(SortKey::Column(SortColumn::StatusId)),
            "invoices" | "expense" => Ok(SortKey::Unsupported(name.to_string())),
            other => SortColumn::from_name(other)
                .map(SortKey::Column)
                .ok_or_else(|| FilterError::UnknownSortColumn(other.to_string())),
        }
    }
}

/// A parsed `"<column>|<direction>"` sort parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub direction: Direction,
}

impl FromStr for SortSpec {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column, direction) = s.split_once('|').ok_or_else(|| {
            FilterError::InvalidArgument(format!(
                "sort must be formatted as column|direction, got {:?}",
                s
            ))
        })?;

        Ok(SortSpec {
            key: SortKey::parse(column)?,
            direction: direction.parse()?,
        })
    }
}
