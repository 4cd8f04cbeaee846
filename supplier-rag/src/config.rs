//! Configuration for the index and the question-answering pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::record::TextField;

/// Model used when the caller does not name one.
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

/// Dataset column holding the record identifier.
pub const DEFAULT_KEYWORD_FIELD: &str = "supplier_id";

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Model used for answer generation when none is given per query.
    pub default_model: String,
    /// Model used for relevance evaluation; `None` reuses the answer model.
    pub evaluation_model: Option<String>,
    /// Maximum number of records placed in the prompt context.
    pub top_k: usize,
    /// Minimum retrieval score for a record to be kept.
    pub min_score: f64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            evaluation_model: None,
            top_k: 10,
            min_score: 0.0,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The model that scores an answer produced by `answer_model`.
    pub fn evaluation_model_for<'a>(&'a self, answer_model: &'a str) -> &'a str {
        self.evaluation_model.as_deref().unwrap_or(answer_model)
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the model used when a query does not name one.
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    /// Evaluate answers with a fixed model instead of the answer model.
    pub fn evaluation_model(mut self, model: impl Into<String>) -> Self {
        self.config.evaluation_model = Some(model.into());
        self
    }

    /// Set the number of records retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum retrieval score.
    pub fn min_score(mut self, score: f64) -> Self {
        self.config.min_score = score;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `top_k == 0`
    /// - `min_score` is negative or not finite
    /// - a model name is empty
    pub fn build(self) -> Result<RagConfig> {
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !self.config.min_score.is_finite() || self.config.min_score < 0.0 {
            return Err(RagError::Config(format!(
                "min_score ({}) must be a finite, non-negative number",
                self.config.min_score
            )));
        }
        if self.config.default_model.trim().is_empty() {
            return Err(RagError::Config("default_model must not be empty".to_string()));
        }
        if self.config.evaluation_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(RagError::Config("evaluation_model must not be empty".to_string()));
        }
        Ok(self.config)
    }
}

/// Schema and weighting used when building a [`ContractIndex`](crate::index::ContractIndex).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexConfig {
    /// Column holding the unique record identifier.
    pub keyword_field: String,
    /// Per-field score multipliers. Fields not listed weigh 1.0.
    #[serde(default)]
    pub boosts: BTreeMap<TextField, f64>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self { keyword_field: DEFAULT_KEYWORD_FIELD.to_string(), boosts: BTreeMap::new() }
    }
}

impl IndexConfig {
    /// Create a new builder for constructing an [`IndexConfig`].
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// The score multiplier applied to `field`.
    pub fn boost(&self, field: TextField) -> f64 {
        self.boosts.get(&field).copied().unwrap_or(1.0)
    }

    /// Check the configuration, however it was constructed.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the keyword field is empty, collides
    /// with a declared text field, or any boost is negative or not finite.
    pub fn validate(&self) -> Result<()> {
        let keyword = self.keyword_field.trim();
        if keyword.is_empty() {
            return Err(RagError::Config("keyword_field must not be empty".to_string()));
        }
        if TextField::from_column(keyword).is_some() {
            return Err(RagError::Config(format!(
                "keyword_field '{keyword}' must not be one of the text fields"
            )));
        }
        if let Some((field, boost)) = self.boosts.iter().find(|(_, b)| !b.is_finite() || **b < 0.0)
        {
            return Err(RagError::Config(format!(
                "boost for '{field}' ({boost}) must be a finite, non-negative number"
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`IndexConfig`].
#[derive(Debug, Clone, Default)]
pub struct IndexConfigBuilder {
    config: IndexConfig,
}

impl IndexConfigBuilder {
    /// Set the identifier column.
    pub fn keyword_field(mut self, field: impl Into<String>) -> Self {
        self.config.keyword_field = field.into();
        self
    }

    /// Weigh matches in `field` by `boost`.
    pub fn boost(mut self, field: TextField, boost: f64) -> Self {
        self.config.boosts.insert(field, boost);
        self
    }

    /// Build the [`IndexConfig`].
    ///
    /// # Errors
    ///
    /// See [`IndexConfig::validate`].
    pub fn build(self) -> Result<IndexConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config, RagConfig::default());
        assert_eq!(config.top_k, 10);
        assert_eq!(config.evaluation_model_for("m"), "m");
    }

    #[test]
    fn rejects_zero_top_k_and_negative_min_score() {
        assert!(matches!(RagConfig::builder().top_k(0).build(), Err(RagError::Config(_))));
        assert!(matches!(RagConfig::builder().min_score(-0.1).build(), Err(RagError::Config(_))));
        assert!(matches!(
            RagConfig::builder().min_score(f64::NAN).build(),
            Err(RagError::Config(_))
        ));
    }

    #[test]
    fn evaluation_model_overrides_answer_model() {
        let config = RagConfig::builder().evaluation_model("judge").build().unwrap();
        assert_eq!(config.evaluation_model_for("answerer"), "judge");
    }

    #[test]
    fn index_config_validation() {
        assert!(IndexConfig::builder().keyword_field("risk_level").build().is_err());
        assert!(IndexConfig::builder().keyword_field(" ").build().is_err());
        assert!(IndexConfig::builder().boost(TextField::KeyTerms, -1.0).build().is_err());

        let config = IndexConfig::builder().boost(TextField::KeyTerms, 2.0).build().unwrap();
        assert_eq!(config.boost(TextField::KeyTerms), 2.0);
        assert_eq!(config.boost(TextField::CostMetrics), 1.0);
    }
}
