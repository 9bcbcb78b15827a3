// 🧩 Predicate combinator - named restriction clauses
//
// A query is a list of clauses AND-ed at the top level. A clause's predicate
// may itself be an OR-group, which is how `client_status` unions status and
// type, and how `status` selects lifecycle states.

use crate::db::{BankTransaction, BaseType, TransactionStatus};
use rusqlite::types::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextColumn {
    BankAccountName,
    Description,
}

impl TextColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            TextColumn::BankAccountName => "bank_transactions.bank_account_name",
            TextColumn::Description => "bank_transactions.description",
        }
    }

    fn value<'a>(&self, tx: &'a BankTransaction) -> &'a str {
        match self {
            TextColumn::BankAccountName => &tx.bank_account_name,
            TextColumn::Description => &tx.description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Case-sensitive substring match, needle taken literally
    Contains { column: TextColumn, needle: String },
    StatusIn(BTreeSet<TransactionStatus>),
    BaseTypeIn(BTreeSet<BaseType>),
    CompanyIs(String),
    /// Never true for a stored row; the neutral seed of an OR-group
    IdIsNull,
    DeletedAtIsNull,
    DeletedAtIsNotNull,
    IsDeleted(bool),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, tx: &BankTransaction) -> bool {
        match self {
            Predicate::Contains { column, needle } => column.value(tx).contains(needle.as_str()),
            Predicate::StatusIn(set) => set.contains(&tx.status),
            Predicate::BaseTypeIn(set) => set.contains(&tx.base_type),
            Predicate::CompanyIs(company_id) => &tx.company_id == company_id,
            Predicate::IdIsNull => false,
            Predicate::DeletedAtIsNull => tx.deleted_at.is_none(),
            Predicate::DeletedAtIsNotNull => tx.deleted_at.is_some(),
            Predicate::IsDeleted(flag) => tx.is_deleted == *flag,
            Predicate::All(parts) => parts.iter().all(|p| p.matches(tx)),
            Predicate::Any(parts) => parts.iter().any(|p| p.matches(tx)),
        }
    }

    /// Append this predicate as a parenthesised SQL expression, pushing bound values
    pub fn write_sql(&self, sql: &mut String, values: &mut Vec<Value>) {
        match self {
            Predicate::Contains { column, needle } => {
                // instr() is case-sensitive and has no wildcard characters, unlike LIKE
                sql.push_str(&format!("instr({}, ?) > 0", column.as_sql()));
                values.push(Value::Text(needle.clone()));
            }
            Predicate::StatusIn(set) => {
                write_in_list(
                    sql,
                    values,
                    "bank_transactions.status_id",
                    set.iter().map(|s| Value::Integer(s.id())),
                );
            }
            Predicate::BaseTypeIn(set) => {
                write_in_list(
                    sql,
                    values,
                    "bank_transactions.base_type",
                    set.iter().map(|t| Value::Text(t.as_str().to_string())),
                );
            }
            Predicate::CompanyIs(company_id) => {
                sql.push_str("bank_transactions.company_id = ?");
                values.push(Value::Text(company_id.clone()));
            }
            Predicate::IdIsNull => sql.push_str("bank_transactions.id IS NULL"),
            Predicate::DeletedAtIsNull => sql.push_str("bank_transactions.deleted_at IS NULL"),
            Predicate::DeletedAtIsNotNull => {
                sql.push_str("bank_transactions.deleted_at IS NOT NULL")
            }
            Predicate::IsDeleted(flag) => {
                sql.push_str("bank_transactions.is_deleted = ?");
                values.push(Value::Integer(i64::from(*flag)));
            }
            Predicate::All(parts) => write_group(sql, values, parts, " AND ", "1"),
            Predicate::Any(parts) => write_group(sql, values, parts, " OR ", "0"),
        }
    }
}

fn write_in_list(
    sql: &mut String,
    values: &mut Vec<Value>,
    column: &str,
    items: impl Iterator<Item = Value>,
) {
    let before = values.len();
    values.extend(items);
    let count = values.len() - before;

    if count == 0 {
        sql.push('0');
        return;
    }

    let placeholders = vec!["?"; count].join(", ");
    sql.push_str(&format!("{} IN ({})", column, placeholders));
}

fn write_group(
    sql: &mut String,
    values: &mut Vec<Value>,
    parts: &[Predicate],
    joiner: &str,
    empty: &str,
) {
    if parts.is_empty() {
        sql.push_str(empty);
        return;
    }

    sql.push('(');
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            sql.push_str(joiner);
        }
        sql.push('(');
        part.write_sql(sql, values);
        sql.push(')');
    }
    sql.push(')');
}

/// A predicate tagged with the builder that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub name: &'static str,
    pub predicate: Predicate,
}

impl Clause {
    pub fn new(name: &'static str, predicate: Predicate) -> Self {
        Clause { name, predicate }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::create_test_transaction;
    use rust_decimal_macros::dec;

    fn render(predicate: &Predicate) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut values = Vec::new();
        predicate.write_sql(&mut sql, &mut values);
        (sql, values)
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let tx = create_test_transaction("Operating Account", "Wire", TransactionStatus::Unmatched, BaseType::Credit, dec!(10));
        let hit = Predicate::Contains { column: TextColumn::BankAccountName, needle: "Operating".to_string() };
        let miss = Predicate::Contains { column: TextColumn::BankAccountName, needle: "operating".to_string() };

        assert!(hit.matches(&tx));
        assert!(!miss.matches(&tx));
    }

    #[test]
    fn test_empty_groups() {
        let tx = create_test_transaction("A", "B", TransactionStatus::Unmatched, BaseType::Credit, dec!(1));

        assert!(Predicate::All(vec![]).matches(&tx));
        assert!(!Predicate::Any(vec![]).matches(&tx));
        assert!(!Predicate::Any(vec![Predicate::IdIsNull]).matches(&tx));

        assert_eq!(render(&Predicate::All(vec![])).0, "1");
        assert_eq!(render(&Predicate::Any(vec![])).0, "0");
    }

    #[test]
    fn test_or_group_sql() {
        let predicate = Predicate::Any(vec![
            Predicate::StatusIn([TransactionStatus::Matched].into_iter().collect()),
            Predicate::BaseTypeIn([BaseType::Credit, BaseType::Debit].into_iter().collect()),
        ]);

        let (sql, values) = render(&predicate);
        assert_eq!(
            sql,
            "((bank_transactions.status_id IN (?)) OR (bank_transactions.base_type IN (?, ?)))"
        );
        assert_eq!(
            values,
            vec![
                Value::Integer(2),
                Value::Text("CREDIT".to_string()),
                Value::Text("DEBIT".to_string()),
            ]
        );
    }
}
