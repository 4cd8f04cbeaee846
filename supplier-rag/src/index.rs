//! Immutable in-memory index over supplier-contract records.
//!
//! [`ContractIndex`] is built once from the full dataset and never mutated
//! afterwards, so it can be shared behind an `Arc` by any number of
//! concurrent queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use supplier_rag::{ContractIndex, Filter, IndexConfig, Retriever, SearchQuery};
//!
//! let index = ContractIndex::build(&IndexConfig::default(), &rows)?;
//! let hits = index.search(
//!     &SearchQuery::new("late deliveries").with_filter(Filter::new().with("risk_level", "High")),
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::analysis::{SparseVector, TfIdfField};
use crate::config::IndexConfig;
use crate::error::{RagError, Result};
use crate::record::{RawRow, SupplierRecord, TextField, normalize};
use crate::search::{Retriever, SearchQuery, SearchResult};

/// A read-only, ranked text index over [`SupplierRecord`]s.
///
/// Records keep their ingestion position, which is the tie-breaker for
/// equal scores.
#[derive(Debug)]
pub struct ContractIndex {
    config: IndexConfig,
    records: Vec<Arc<SupplierRecord>>,
    positions: HashMap<String, usize>,
    fields: Vec<(TextField, TfIdfField)>,
}

impl ContractIndex {
    /// Build an index from raw dataset rows.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `config` is invalid, and
    /// [`RagError::Dataset`] if any row lacks the keyword column or a
    /// declared text column, if an identifier is empty, or if two rows share
    /// an identifier.
    pub fn build(config: &IndexConfig, rows: &[RawRow]) -> Result<Self> {
        config.validate()?;
        let keyword_field = config.keyword_field.as_str();
        let mut records = Vec::with_capacity(rows.len());
        let mut positions = HashMap::with_capacity(rows.len());

        for (row_number, row) in rows.iter().enumerate() {
            if let Some(missing) = std::iter::once(keyword_field)
                .chain(TextField::ALL.iter().map(|f| f.column()))
                .find(|column| !row.contains_key(*column))
            {
                return Err(RagError::Dataset(format!(
                    "row {row_number} is missing declared field '{missing}'"
                )));
            }

            let id = normalize(row.get(keyword_field).and_then(|v| v.as_deref()));
            if id.is_empty() {
                return Err(RagError::Dataset(format!(
                    "row {row_number} has an empty identifier in '{keyword_field}'"
                )));
            }
            if let Some(first) = positions.get(&id) {
                return Err(RagError::Dataset(format!(
                    "duplicate identifier '{id}' in rows {first} and {row_number}"
                )));
            }

            positions.insert(id.clone(), records.len());
            records.push(Arc::new(SupplierRecord::from_row(id, keyword_field, row)));
        }

        let fields: Vec<_> = TextField::ALL
            .iter()
            .map(|&field| {
                let model = TfIdfField::fit(records.iter().map(|r| r.field(field)));
                (field, model)
            })
            .collect();

        info!(
            record_count = records.len(),
            keyword_field,
            vocabulary_size = fields.iter().map(|(_, m)| m.vocabulary_size()).sum::<usize>(),
            "built contract index"
        );

        Ok(Self { config: config.clone(), records, positions, fields })
    }

    /// Look up a record by identifier.
    pub fn get(&self, id: &str) -> Option<&Arc<SupplierRecord>> {
        self.positions.get(id).map(|&pos| &self.records[pos])
    }

    /// All records in ingestion order.
    pub fn records(&self) -> &[Arc<SupplierRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Σ over fields of `boost × cosine(query, field)`.
    fn score(&self, projected: &[(f64, &TfIdfField, SparseVector)], pos: usize) -> f64 {
        projected.iter().map(|(boost, model, query)| boost * model.similarity(query, pos)).sum()
    }
}

impl Retriever for ContractIndex {
    fn search(&self, query: &SearchQuery) -> Vec<SearchResult> {
        if query.limit == 0 {
            return Vec::new();
        }

        let keyword_field = self.config.keyword_field.as_str();
        let candidates: Vec<usize> = (0..self.records.len())
            .filter(|&pos| query.filter.matches(&self.records[pos], keyword_field))
            .collect();
        if candidates.is_empty() {
            debug!(filter = ?query.filter, "filter excluded every record");
            return Vec::new();
        }

        let projected: Vec<_> = self
            .fields
            .iter()
            .map(|(field, model)| (self.config.boost(*field), model, model.transform(&query.text)))
            .filter(|(boost, _, vector)| *boost > 0.0 && !vector.is_empty())
            .collect();

        let mut scored: Vec<(usize, f64)> =
            candidates.into_iter().map(|pos| (pos, self.score(&projected, pos))).collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(query.limit);

        debug!(query = %query.text, result_count = scored.len(), "search completed");

        scored
            .into_iter()
            .map(|(pos, score)| SearchResult { record: Arc::clone(&self.records[pos]), score })
            .collect()
    }
}
