//! Query, filter, and result types plus the [`Retriever`] seam.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::record::SupplierRecord;

/// Result count used when a query does not set one.
pub const DEFAULT_LIMIT: usize = 10;

/// Filter key that always addresses the record identifier, whatever the
/// underlying keyword column is called.
pub const ID_KEY: &str = "id";

/// Exact-match constraints on record columns.
///
/// Every entry must match for a record to pass. An empty filter passes
/// every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    /// An unrestricted filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value` exactly.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Whether the filter imposes no restriction.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the `(field, value)` constraints.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Check a record against every constraint. Constraints on columns the
    /// record does not have never match.
    pub fn matches(&self, record: &SupplierRecord, keyword_field: &str) -> bool {
        self.0.iter().all(|(field, expected)| {
            let actual = if field == ID_KEY || field == keyword_field {
                Some(record.id.as_str())
            } else {
                record.column(field)
            };
            actual == Some(expected.as_str())
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Filter {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// A ranked text query with an optional filter and a result limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    #[serde(default)]
    pub filter: Filter,
    pub limit: usize,
}

impl SearchQuery {
    /// An unfiltered query returning up to [`DEFAULT_LIMIT`] records.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), filter: Filter::default(), limit: DEFAULT_LIMIT }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// A retrieved record paired with its relevance score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved record.
    pub record: Arc<SupplierRecord>,
    /// Text-relevance score (higher is more relevant, never negative).
    pub score: f64,
}

/// A retrieval capability the pipeline can query.
///
/// Implementations must be deterministic: the same query against the same
/// data returns the same records in the same order, with ties broken by
/// ingestion order.
pub trait Retriever: Send + Sync {
    /// Return at most `query.limit` records passing `query.filter`, best
    /// first. An empty result is not an error.
    fn search(&self, query: &SearchQuery) -> Vec<SearchResult>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RawRow;

    fn record(id: &str, risk: &str) -> SupplierRecord {
        let row: RawRow = [("risk_level".to_string(), Some(risk.to_string()))].into();
        SupplierRecord::from_row(id.to_string(), "supplier_id", &row)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&record("1", "High"), "supplier_id"));
    }

    #[test]
    fn id_key_and_keyword_column_both_address_the_identifier() {
        let r = record("42", "Low");
        assert!(Filter::new().with("id", "42").matches(&r, "supplier_id"));
        assert!(Filter::new().with("supplier_id", "42").matches(&r, "supplier_id"));
        assert!(!Filter::new().with("id", "4").matches(&r, "supplier_id"));
    }

    #[test]
    fn all_constraints_must_hold() {
        let r = record("1", "High");
        let both = Filter::from_iter([("id", "1"), ("risk_level", "High")]);
        assert!(both.matches(&r, "supplier_id"));
        let wrong = Filter::from_iter([("id", "1"), ("risk_level", "high")]);
        assert!(!wrong.matches(&r, "supplier_id"));
    }

    #[test]
    fn unknown_columns_never_match() {
        assert!(!Filter::new().with("region", "EMEA").matches(&record("1", "High"), "supplier_id"));
    }

    #[test]
    fn query_defaults() {
        let query = SearchQuery::new("late deliveries");
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert!(query.filter.is_empty());
    }
}
