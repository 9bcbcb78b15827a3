// 🗄️ Bank transaction storage - SQLite schema, CSV ingestion, row mapping
// Records are written by ingestion only; the list filters never mutate them.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Column list shared by every SELECT that maps through `row_to_transaction`
pub(crate) const SELECT_COLUMNS: &str = "id, company_id, date, description, bank_account_name,
        status_id, base_type, amount, deleted_at, is_deleted";

// ============================================================================
// ENUMERATIONS
// ============================================================================

/// Matching state of an imported transaction.
///
/// Declaration order follows `status_id` so derived `Ord` agrees with SQL ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Unmatched,
    Matched,
    Converted,
}

impl TransactionStatus {
    pub fn id(&self) -> i64 {
        match self {
            TransactionStatus::Unmatched => 1,
            TransactionStatus::Matched => 2,
            TransactionStatus::Converted => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(TransactionStatus::Unmatched),
            2 => Some(TransactionStatus::Matched),
            3 => Some(TransactionStatus::Converted),
            _ => None,
        }
    }
}

/// Direction of money movement on the bank account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseType {
    /// Deposit
    Credit,
    /// Withdrawal
    Debit,
}

impl BaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaseType::Credit => "CREDIT",
            BaseType::Debit => "DEBIT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CREDIT" => Some(BaseType::Credit),
            "DEBIT" => Some(BaseType::Debit),
            _ => None,
        }
    }
}

// ============================================================================
// BANK TRANSACTION
// ============================================================================

/// A transaction pulled from a bank feed.
///
/// `deleted_at` and `is_deleted` are independent signals:
/// - `deleted_at` unset → active
/// - `deleted_at` set, `is_deleted` false → archived
/// - `is_deleted` true → deleted (regardless of `deleted_at`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    /// Stable identity (UUID)
    #[serde(default = "default_uuid")]
    pub id: String,

    /// Owning organization
    pub company_id: String,

    pub date: NaiveDate,

    pub description: String,

    pub bank_account_name: String,

    pub status: TransactionStatus,

    pub base_type: BaseType,

    /// Signed amount, stored exactly
    pub amount: Decimal,

    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub is_deleted: bool,
}

fn default_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl BankTransaction {
    /// Digest of the feed content alone, without `id`
    fn content_digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}|{}|{}|{}|{}",
            self.company_id, self.date, self.amount, self.bank_account_name, self.description
        ));
        format!("{:x}", hasher.finalize())
    }

    /// Compute idempotency hash for duplicate detection on re-import.
    /// Covers `id` too: two identical charges with their own ids are two records.
    pub fn compute_idempotency_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}|{}", self.id, self.content_digest()));
        format!("{:x}", hasher.finalize())
    }

    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn is_archived(&self) -> bool {
        self.deleted_at.is_some() && !self.is_deleted
    }
}

/// Text key whose byte order is the numeric order of `amount`.
///
/// Sign byte, then 29 integer and 28 fraction digits (the widest a `Decimal`
/// holds), nines-complemented for negatives so larger debts sort first.
pub(crate) fn amount_sort_key(amount: &Decimal) -> String {
    let negative = amount.is_sign_negative() && !amount.is_zero();
    let magnitude = amount.abs().to_string();
    let (int_part, frac_part) = magnitude.split_once('.').unwrap_or((magnitude.as_str(), ""));

    let digits = format!("{:0>29}{:0<28}", int_part, frac_part);
    if negative {
        let complemented: String = digits
            .bytes()
            .map(|d| char::from(b'9' - (d - b'0')))
            .collect();
        format!("0{}", complemented)
    } else {
        format!("1{}", digits)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

/// Open (or create) a database file with WAL journaling and the schema in place
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;

    // Enable WAL mode for crash recovery
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    tracing::debug!(?path, journal_mode = %mode, "database opened");

    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS bank_transactions (
            row_id INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            idempotency_hash TEXT UNIQUE NOT NULL,
            company_id TEXT NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            bank_account_name TEXT NOT NULL,
            status_id INTEGER NOT NULL,
            base_type TEXT NOT NULL,
            amount TEXT NOT NULL,
            amount_key TEXT NOT NULL,
            deleted_at TEXT,
            is_deleted INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_transactions_company ON bank_transactions(company_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_bank_transactions_status ON bank_transactions(status_id, base_type)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// INGESTION
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub duplicates: usize,
}

/// One row of a bank feed export.
/// Amount is kept as text so it parses exactly into a `Decimal`.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    id: Option<String>,
    company_id: String,
    date: NaiveDate,
    description: String,
    bank_account_name: String,
    status: TransactionStatus,
    base_type: BaseType,
    amount: String,
    #[serde(default)]
    deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    is_deleted: Option<bool>,
}

pub fn load_csv(csv_path: &Path) -> Result<Vec<BankTransaction>> {
    let rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;
    read_csv(rdr)
}

pub fn read_csv<R: std::io::Read>(mut rdr: csv::Reader<R>) -> Result<Vec<BankTransaction>> {
    let mut transactions = Vec::new();

    for (index, result) in rdr.deserialize().enumerate() {
        let row: CsvRow = result.context("Failed to deserialize transaction")?;
        let amount = Decimal::from_str(row.amount.trim())
            .with_context(|| format!("Invalid amount {:?} on record {}", row.amount, index + 1))?;

        let mut tx = BankTransaction {
            id: String::new(),
            company_id: row.company_id,
            date: row.date,
            description: row.description,
            bank_account_name: row.bank_account_name,
            status: row.status,
            base_type: row.base_type,
            amount,
            deleted_at: row.deleted_at,
            is_deleted: row.is_deleted.unwrap_or(false),
        };
        // rows without an id get one derived from content, so re-imports still dedup
        tx.id = match row.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => format!("feed-{}", &tx.content_digest()[..32]),
        };
        transactions.push(tx);
    }

    Ok(transactions)
}

pub fn insert_transactions(conn: &Connection, transactions: &[BankTransaction]) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for tx in transactions {
        let hash = tx.compute_idempotency_hash();

        // Only a repeated hash is a duplicate; an `id` reused for different
        // content still fails on the `id` UNIQUE constraint.
        let changed = conn
            .execute(
                "INSERT INTO bank_transactions (
                    id, idempotency_hash, company_id, date, description, bank_account_name,
                    status_id, base_type, amount, amount_key, deleted_at, is_deleted
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(idempotency_hash) DO NOTHING",
                params![
                    tx.id,
                    hash,
                    tx.company_id,
                    tx.date.format("%Y-%m-%d").to_string(),
                    tx.description,
                    tx.bank_account_name,
                    tx.status.id(),
                    tx.base_type.as_str(),
                    tx.amount.to_string(),
                    amount_sort_key(&tx.amount),
                    tx.deleted_at
                        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Nanos, true)),
                    tx.is_deleted,
                ],
            )
            .with_context(|| format!("Failed to insert bank transaction {:?}", tx.id))?;

        if changed == 0 {
            summary.duplicates += 1;
        } else {
            summary.inserted += 1;
        }
    }

    tracing::info!(
        inserted = summary.inserted,
        duplicates = summary.duplicates,
        "bank transactions imported"
    );

    Ok(summary)
}

// ============================================================================
// LOOKUP
// ============================================================================

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Option<BankTransaction>> {
    let sql = format!("SELECT {} FROM bank_transactions WHERE id = ?1", SELECT_COLUMNS);
    let tx = conn
        .query_row(&sql, [id], row_to_transaction)
        .optional()?;
    Ok(tx)
}

pub fn verify_count(conn: &Connection) -> Result<i64> {
    let count: i64 =
        conn.query_row("SELECT COUNT(*) FROM bank_transactions", [], |row| row.get(0))?;

    Ok(count)
}

fn conversion_error<E>(index: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
}

#[derive(Debug)]
struct UnknownValue(String);

impl std::fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown stored value: {}", self.0)
    }
}

impl std::error::Error for UnknownValue {}

/// Map a row selected with `SELECT_COLUMNS`
pub(crate) fn row_to_transaction(row: &Row) -> rusqlite::Result<BankTransaction> {
    let date_str: String = row.get(2)?;
    let status_id: i64 = row.get(5)?;
    let base_type_str: String = row.get(6)?;
    let amount_str: String = row.get(7)?;
    let deleted_at_str: Option<String> = row.get(8)?;

    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
        .map_err(|e| conversion_error(2, e))?;
    let status = TransactionStatus::from_id(status_id)
        .ok_or_else(|| conversion_error(5, UnknownValue(status_id.to_string())))?;
    let base_type = BaseType::parse(&base_type_str)
        .ok_or_else(|| conversion_error(6, UnknownValue(base_type_str.clone())))?;
    let amount = Decimal::from_str(&amount_str).map_err(|e| conversion_error(7, e))?;
    let deleted_at = deleted_at_str
        .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| conversion_error(8, e))?;

    Ok(BankTransaction {
        id: row.get(0)?,
        company_id: row.get(1)?,
        date,
        description: row.get(3)?,
        bank_account_name: row.get(4)?,
        status,
        base_type,
        amount,
        deleted_at,
        is_deleted: row.get(9)?,
    })
}
