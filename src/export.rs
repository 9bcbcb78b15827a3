// 📤 Report export - filtered bank transactions as CSV

use crate::db::{BankTransaction, TransactionStatus};
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

pub const EXPORT_FILENAME: &str = "bank_transactions.csv";

#[derive(Serialize)]
struct ExportRow<'a> {
    id: &'a str,
    date: String,
    bank_account_name: &'a str,
    description: &'a str,
    status: &'static str,
    base_type: &'static str,
    amount: String,
    archived: bool,
    deleted: bool,
}

impl<'a> From<&'a BankTransaction> for ExportRow<'a> {
    fn from(tx: &'a BankTransaction) -> Self {
        Self {
            id: &tx.id,
            date: tx.date.format("%Y-%m-%d").to_string(),
            bank_account_name: &tx.bank_account_name,
            description: &tx.description,
            status: match tx.status {
                TransactionStatus::Unmatched => "unmatched",
                TransactionStatus::Matched => "matched",
                TransactionStatus::Converted => "converted",
            },
            base_type: tx.base_type.as_str(),
            amount: tx.amount.to_string(),
            archived: tx.is_archived(),
            deleted: tx.is_deleted,
        }
    }
}

/// Write `transactions` as CSV with a header row, in the given order
pub fn write_csv<W: Write>(writer: W, transactions: &[BankTransaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    for tx in transactions {
        wtr.serialize(ExportRow::from(tx))
            .with_context(|| format!("Failed to write transaction {}", tx.id))?;
    }

    // An empty export still gets its header
    if transactions.is_empty() {
        wtr.write_record([
            "id",
            "date",
            "bank_account_name",
            "description",
            "status",
            "base_type",
            "amount",
            "archived",
            "deleted",
        ])?;
    }

    wtr.flush().context("Failed to flush CSV export")?;
    Ok(())
}

pub fn export_to_string(transactions: &[BankTransaction]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, transactions)?;
    String::from_utf8(buf).context("CSV export is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::create_test_transaction;
    use crate::db::BaseType;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    #[test]
    fn test_export_rows() {
        let mut archived = create_test_transaction("Operating", "OLD FEE", TransactionStatus::Converted, BaseType::Debit, dec!(-3.50));
        archived.id = "tx-2".to_string();
        archived.deleted_at = Some(Utc::now());

        let mut live = create_test_transaction("Operating", "WIRE, INBOUND", TransactionStatus::Matched, BaseType::Credit, dec!(120.00));
        live.id = "tx-1".to_string();

        let csv = export_to_string(&[live, archived]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "id,date,bank_account_name,description,status,base_type,amount,archived,deleted"
        );
        assert_eq!(
            lines[1],
            "tx-1,2024-03-01,Operating,\"WIRE, INBOUND\",matched,CREDIT,120.00,false,false"
        );
        assert_eq!(
            lines[2],
            "tx-2,2024-03-01,Operating,OLD FEE,converted,DEBIT,-3.50,true,false"
        );
    }

    #[test]
    fn test_empty_export_has_header() {
        let csv = export_to_string(&[]).unwrap();
        assert_eq!(
            csv,
            "id,date,bank_account_name,description,status,base_type,amount,archived,deleted\n"
        );
    }
}
