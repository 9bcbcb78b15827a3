// 🔎 Transaction query composer - list parameters → tenant-scoped query
//
// Builders are applied left to right (name → filter → client_status →
// status → sort) and each one only ever narrows or orders the query. Their
// clauses are AND-ed; the only OR lives inside a single clause.

use super::params::{
    split_tokens, ClientStatusToken, Direction, LifecycleToken, ListParams, SortColumn, SortKey,
    SortSpec,
};
use super::predicate::{Clause, Predicate, TextColumn};
use super::query::{OrderBy, TransactionQuery};
use crate::db::BaseType;
use crate::error::FilterError;
use crate::store::TenantScope;
use std::collections::BTreeSet;

pub const ENTITY_CLAUSE: &str = "entity";
pub const NAME_CLAUSE: &str = "name";
pub const FILTER_CLAUSE: &str = "filter";
pub const CLIENT_STATUS_CLAUSE: &str = "client_status";
pub const STATUS_CLAUSE: &str = "status";
pub const SORT_CLAUSE: &str = "sort";

#[derive(Debug, Clone, Default)]
pub struct TransactionQueryComposer {
    query: TransactionQuery,
}

impl TransactionQueryComposer {
    /// Unscoped composer. Callers listing on behalf of a user want `for_tenant`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_tenant(scope: &dyn TenantScope) -> Self {
        Self::new().entity_filter(scope)
    }

    /// Run every builder in the fixed order
    pub fn apply(self, params: &ListParams) -> Result<Self, FilterError> {
        self.name(&params.name)
            .filter(&params.filter)
            .client_status(&params.client_status)
            .status(&params.status)
            .sort(&params.sort)
    }

    /// Restrict to records owned by the caller's organization
    pub fn entity_filter(mut self, scope: &dyn TenantScope) -> Self {
        self.query.restrict(Clause::new(
            ENTITY_CLAUSE,
            Predicate::CompanyIs(scope.company_id().to_string()),
        ));
        self
    }

    /// Bank account name contains `text`
    pub fn name(mut self, text: &str) -> Self {
        if text.is_empty() {
            return self;
        }

        self.query.restrict(Clause::new(
            NAME_CLAUSE,
            Predicate::Contains {
                column: TextColumn::BankAccountName,
                needle: text.to_string(),
            },
        ));
        self
    }

    /// Legacy free-text search over the description.
    /// Kept for older clients; new ones should use the specific filters.
    pub fn filter(mut self, text: &str) -> Self {
        if text.is_empty() {
            return self;
        }

        self.query.restrict(Clause::new(
            FILTER_CLAUSE,
            Predicate::Contains {
                column: TextColumn::Description,
                needle: text.to_string(),
            },
        ));
        self
    }

    /// Matching state and money direction, e.g. `"matched,deposits"`.
    ///
    /// `all` anywhere in the list disables the filter. Status tokens and
    /// direction tokens are each OR-ed into a set, and when both sets are
    /// present the two are OR-ed together: `"matched,deposits"` lists every
    /// matched transaction *and* every deposit.
    pub fn client_status(mut self, values: &str) -> Self {
        if values.is_empty() {
            return self;
        }

        let mut statuses = BTreeSet::new();
        let mut kinds = BTreeSet::new();

        for token in split_tokens(values).map(ClientStatusToken::parse) {
            match token {
                ClientStatusToken::All => return self,
                ClientStatusToken::Status(status) => {
                    statuses.insert(status);
                }
                ClientStatusToken::Kind(kind) => {
                    kinds.insert(kind);
                }
                ClientStatusToken::Ignored(token) => {
                    tracing::debug!(%token, "ignoring unknown client_status token");
                }
            }
        }

        let predicate = match (statuses.is_empty(), kinds.is_empty()) {
            (true, true) => return self,
            (false, true) => Predicate::StatusIn(statuses),
            (true, false) => Predicate::BaseTypeIn(kinds),
            (false, false) => Predicate::Any(vec![
                Predicate::StatusIn(statuses),
                Predicate::BaseTypeIn(kinds),
            ]),
        };

        self.query.restrict(Clause::new(CLIENT_STATUS_CLAUSE, predicate));
        self
    }

    /// Lifecycle visibility: any combination of `active`, `archived`, `deleted`.
    ///
    /// A non-empty list that names none of those selects nothing at all,
    /// which is different from an empty list (no restriction).
    pub fn status(mut self, values: &str) -> Self {
        if values.is_empty() {
            return self;
        }

        let tokens: Vec<LifecycleToken> = split_tokens(values).map(LifecycleToken::parse).collect();
        let mut group = vec![Predicate::IdIsNull];

        if tokens.contains(&LifecycleToken::Active) {
            group.push(Predicate::DeletedAtIsNull);
        }

        if tokens.contains(&LifecycleToken::Archived) {
            group.push(Predicate::All(vec![
                Predicate::DeletedAtIsNotNull,
                Predicate::IsDeleted(false),
            ]));
        }

        if tokens.contains(&LifecycleToken::Deleted) {
            group.push(Predicate::IsDeleted(true));
        }

        for token in &tokens {
            if let LifecycleToken::Ignored(token) = token {
                tracing::debug!(%token, "ignoring unknown status token");
            }
        }

        if group.len() == 1 {
            tracing::debug!(values, "status filter names no known state; no rows can match");
        }

        self.query.restrict(Clause::new(STATUS_CLAUSE, Predicate::Any(group)));
        self
    }

    /// Order by `"<column>|<direction>"`.
    ///
    /// `deposit` and `withdrawal` also restrict to credits or debits
    /// respectively and order by amount. `invoices` and `expense` are accepted
    /// and ignored.
    pub fn sort(mut self, spec: &str) -> Result<Self, FilterError> {
        if spec.is_empty() {
            return Ok(self);
        }

        let SortSpec { key, direction } = spec.parse()?;

        match key {
            SortKey::Deposit => self.restrict_kind_by_amount(BaseType::Credit, direction),
            SortKey::Withdrawal => self.restrict_kind_by_amount(BaseType::Debit, direction),
            SortKey::Unsupported(key) => {
                tracing::debug!(%key, "sort key has no orderable column; ignoring");
            }
            SortKey::Column(column) => self.query.order_by(OrderBy { column, direction }),
        }

        Ok(self)
    }

    fn restrict_kind_by_amount(&mut self, kind: BaseType, direction: Direction) {
        self.query.restrict(Clause::new(
            SORT_CLAUSE,
            Predicate::BaseTypeIn(BTreeSet::from([kind])),
        ));
        self.query.order_by(OrderBy {
            column: SortColumn::Amount,
            direction,
        });
    }

    pub fn query(&self) -> &TransactionQuery {
        &self.query
    }

    pub fn into_query(self) -> TransactionQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionStatus;
    use crate::store::FixedTenant;

    fn composer() -> TransactionQueryComposer {
        TransactionQueryComposer::new()
    }

    #[test]
    fn test_empty_inputs_are_identity() {
        let base = TransactionQueryComposer::for_tenant(&FixedTenant::new("acme"));
        let expected = base.query().clone();

        let after = base
            .name("")
            .filter("")
            .client_status("")
            .status("")
            .sort("")
            .unwrap();

        assert_eq!(after.query(), &expected);
    }

    #[test]
    fn test_entity_filter_always_first() {
        let params = ListParams {
            name: "Operating".to_string(),
            ..Default::default()
        };
        let query = TransactionQueryComposer::for_tenant(&FixedTenant::new("acme"))
            .apply(&params)
            .unwrap()
            .into_query();

        assert_eq!(query.clauses()[0].name, ENTITY_CLAUSE);
        assert_eq!(
            query.clauses()[0].predicate,
            Predicate::CompanyIs("acme".to_string())
        );
        assert_eq!(query.clauses()[1].name, NAME_CLAUSE);
    }

    #[test]
    fn test_client_status_all_short_circuits() {
        let query = composer().client_status("matched,all,deposits").into_query();
        assert!(query.clauses().is_empty());
    }

    #[test]
    fn test_client_status_unions_status_and_kind() {
        let query = composer().client_status("matched,deposits").into_query();

        assert_eq!(query.clauses().len(), 1);
        assert_eq!(
            query.clause(CLIENT_STATUS_CLAUSE).unwrap().predicate,
            Predicate::Any(vec![
                Predicate::StatusIn(BTreeSet::from([TransactionStatus::Matched])),
                Predicate::BaseTypeIn(BTreeSet::from([BaseType::Credit])),
            ])
        );
    }

    #[test]
    fn test_client_status_single_side() {
        let query = composer().client_status("unmatched,converted").into_query();
        assert_eq!(
            query.clause(CLIENT_STATUS_CLAUSE).unwrap().predicate,
            Predicate::StatusIn(BTreeSet::from([
                TransactionStatus::Unmatched,
                TransactionStatus::Converted,
            ]))
        );

        let query = composer().client_status("withdrawals").into_query();
        assert_eq!(
            query.clause(CLIENT_STATUS_CLAUSE).unwrap().predicate,
            Predicate::BaseTypeIn(BTreeSet::from([BaseType::Debit]))
        );
    }

    #[test]
    fn test_client_status_unknown_tokens_only() {
        let query = composer().client_status("reconciled,pending").into_query();
        assert!(query.clauses().is_empty());
    }

    #[test]
    fn test_status_group_shape() {
        let query = composer().status("deleted,active").into_query();

        assert_eq!(
            query.clause(STATUS_CLAUSE).unwrap().predicate,
            Predicate::Any(vec![
                Predicate::IdIsNull,
                Predicate::DeletedAtIsNull,
                Predicate::IsDeleted(true),
            ])
        );
    }

    #[test]
    fn test_status_unknown_tokens_select_nothing() {
        let query = composer().status("trashed").into_query();

        assert_eq!(
            query.clause(STATUS_CLAUSE).unwrap().predicate,
            Predicate::Any(vec![Predicate::IdIsNull])
        );
    }

    #[test]
    fn test_sort_deposit_restricts_and_orders() {
        let query = composer().sort("deposit|asc").unwrap().into_query();

        assert_eq!(
            query.clause(SORT_CLAUSE).unwrap().predicate,
            Predicate::BaseTypeIn(BTreeSet::from([BaseType::Credit]))
        );
        assert_eq!(
            query.ordering(),
            &[OrderBy { column: SortColumn::Amount, direction: Direction::Asc }]
        );
    }

    #[test]
    fn test_sort_status_orders_without_restricting() {
        let query = composer().sort("status|desc").unwrap().into_query();

        assert!(query.clauses().is_empty());
        assert_eq!(
            query.ordering(),
            &[OrderBy { column: SortColumn::StatusId, direction: Direction::Desc }]
        );
    }

    #[test]
    fn test_sort_relation_keys_are_noops() {
        for spec in ["invoices|asc", "expense|desc"] {
            let query = composer().sort(spec).unwrap().into_query();
            assert_eq!(query, TransactionQuery::new());
        }
    }

    #[test]
    fn test_sort_missing_direction() {
        let err = composer().sort("amount").unwrap_err();
        assert!(matches!(err, FilterError::InvalidArgument(_)));
    }

    #[test]
    fn test_sort_unknown_column() {
        let err = composer().sort("created_by|asc").unwrap_err();
        assert_eq!(err, FilterError::UnknownSortColumn("created_by".to_string()));
    }

    #[test]
    fn test_builders_are_idempotent() {
        let once = composer()
            .name("Ops")
            .filter("wire")
            .client_status("matched,withdrawals")
            .status("active,archived")
            .sort("withdrawal|desc")
            .unwrap()
            .into_query();

        let twice = composer()
            .name("Ops")
            .name("Ops")
            .filter("wire")
            .filter("wire")
            .client_status("matched,withdrawals")
            .client_status("matched,withdrawals")
            .status("active,archived")
            .status("active,archived")
            .sort("withdrawal|desc")
            .unwrap()
            .sort("withdrawal|desc")
            .unwrap()
            .into_query();

        assert_eq!(once, twice);
    }
}
