use super::params::{Direction, SortColumn};
use super::predicate::{Clause, Predicate};
use crate::db::BankTransaction;
use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub column: SortColumn,
    pub direction: Direction,
}

/// The accumulator threaded through the list builders: AND-ed clauses plus
/// an ordering, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionQuery {
    clauses: Vec<Clause>,
    order: Vec<OrderBy>,
}

impl TransactionQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause. A clause equal to one already present is not added twice.
    pub fn restrict(&mut self, clause: Clause) {
        if !self.clauses.contains(&clause) {
            self.clauses.push(clause);
        }
    }

    /// Add an ordering. Later orderings break ties of earlier ones.
    pub fn order_by(&mut self, order: OrderBy) {
        if !self.order.contains(&order) {
            self.order.push(order);
        }
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order
    }

    pub fn clause(&self, name: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.name == name)
    }

    pub fn matches(&self, tx: &BankTransaction) -> bool {
        self.clauses.iter().all(|c| c.predicate.matches(tx))
    }

    /// Stable in-memory ordering; rows that tie keep their incoming order
    pub fn sort(&self, transactions: &mut [BankTransaction]) {
        if self.order.is_empty() {
            return;
        }

        transactions.sort_by(|a, b| {
            self.order
                .iter()
                .map(|o| o.direction.apply(o.column.compare(a, b)))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    /// WHERE expression (without the keyword) and its bound values.
    /// `None` when nothing restricts the query.
    pub fn where_sql(&self) -> Option<(String, Vec<Value>)> {
        if self.clauses.is_empty() {
            return None;
        }

        let mut sql = String::new();
        let mut values = Vec::new();
        let predicate = Predicate::All(self.clauses.iter().map(|c| c.predicate.clone()).collect());
        predicate.write_sql(&mut sql, &mut values);
        Some((sql, values))
    }

    /// ORDER BY list (without the keyword). Insertion order breaks remaining ties.
    pub fn order_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .order
            .iter()
            .map(|o| format!("{} {}", o.column.as_sql(), o.direction.as_sql()))
            .collect();
        parts.push("bank_transactions.row_id ASC".to_string());
        parts.join(", ")
    }
}
