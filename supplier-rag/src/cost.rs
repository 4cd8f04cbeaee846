//! Per-call cost accounting from token usage and a static price table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::{RagError, Result};
use crate::llm::TokenUsage;

/// Prices for one model, per 1000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

impl ModelPrice {
    pub const fn new(prompt_per_1k: f64, completion_per_1k: f64) -> Self {
        Self { prompt_per_1k, completion_per_1k }
    }

    /// `(prompt × prompt_rate + completion × completion_rate) / 1000`
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.prompt_tokens as f64 * self.prompt_per_1k
            + usage.completion_tokens as f64 * self.completion_per_1k)
            / 1000.0
    }
}

/// The model has no entry in the price table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no price configured for model '{model}'")]
pub struct CostLookupError {
    pub model: String,
}

/// The amount billed for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub model: String,
    pub usage: TokenUsage,
    /// Zero when the model could not be priced.
    pub amount: f64,
    /// Set when the price lookup failed and `amount` defaulted to zero.
    #[serde(skip)]
    pub lookup_error: Option<CostLookupError>,
}

impl CostReport {
    pub fn is_priced(&self) -> bool {
        self.lookup_error.is_none()
    }
}

/// A static mapping from model identifier to [`ModelPrice`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PricingTable {
    prices: BTreeMap<String, ModelPrice>,
}

/// Groq-hosted models the pipeline ships prices for.
const BUILTIN_PRICES: &[(&str, ModelPrice)] = &[
    ("llama3-8b-8192", ModelPrice::new(0.00015, 0.0006)),
    ("Llama3-groq-70b-8192-tool-use-preview", ModelPrice::new(0.00015, 0.0006)),
];

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            prices: BUILTIN_PRICES.iter().map(|(model, price)| (model.to_string(), *price)).collect(),
        }
    }
}

impl PricingTable {
    /// A table with no prices at all.
    pub fn empty() -> Self {
        Self { prices: BTreeMap::new() }
    }

    /// Add or replace the price for `model`.
    pub fn with_price(mut self, model: impl Into<String>, price: ModelPrice) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// Parse a JSON object of `{ "model": { "prompt_per_1k": .., "completion_per_1k": .. } }`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the JSON is malformed or any rate is
    /// negative or not finite.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)
            .map_err(|e| RagError::Config(format!("invalid pricing table: {e}")))?;
        if let Some((model, _)) = table.prices.iter().find(|(_, p)| {
            !(p.prompt_per_1k.is_finite() && p.completion_per_1k.is_finite())
                || p.prompt_per_1k < 0.0
                || p.completion_per_1k < 0.0
        }) {
            return Err(RagError::Config(format!(
                "pricing for '{model}' must be finite and non-negative"
            )));
        }
        Ok(table)
    }

    /// Merge `other` into this table, `other` winning on conflicts.
    pub fn extend(&mut self, other: PricingTable) {
        self.prices.extend(other.prices);
    }

    pub fn price(&self, model: &str) -> std::result::Result<ModelPrice, CostLookupError> {
        self.prices.get(model).copied().ok_or_else(|| CostLookupError { model: model.to_string() })
    }

    /// Price `usage` for `model`.
    ///
    /// An unknown model is not fatal: the report carries a zero amount and
    /// the [`CostLookupError`], and a warning is logged.
    pub fn cost(&self, model: &str, usage: TokenUsage) -> CostReport {
        match self.price(model) {
            Ok(price) => CostReport {
                model: model.to_string(),
                usage,
                amount: price.cost(&usage),
                lookup_error: None,
            },
            Err(error) => {
                warn!(model, "model not recognized; cost counted as 0");
                CostReport { model: model.to_string(), usage, amount: 0.0, lookup_error: Some(error) }
            }
        }
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_is_priced_per_thousand_tokens() {
        let report = PricingTable::default().cost("llama3-8b-8192", TokenUsage::new(1000, 1000));
        assert!(report.is_priced());
        assert!((report.amount - (0.00015 + 0.0006)).abs() < 1e-15);
    }

    #[test]
    fn unknown_model_costs_zero_with_typed_error() {
        let report = PricingTable::default().cost("gpt-unknown", TokenUsage::new(500, 20));
        assert_eq!(report.amount, 0.0);
        assert_eq!(report.lookup_error, Some(CostLookupError { model: "gpt-unknown".into() }));
        assert_eq!(report.usage, TokenUsage::new(500, 20));
    }

    #[test]
    fn from_json_parses_and_validates() {
        let table = PricingTable::from_json(
            r#"{"custom": {"prompt_per_1k": 0.5, "completion_per_1k": 1.5}}"#,
        )
        .unwrap();
        assert_eq!(table.price("custom").unwrap(), ModelPrice::new(0.5, 1.5));
        assert!(table.price("llama3-8b-8192").is_err());

        assert!(
            PricingTable::from_json(r#"{"bad": {"prompt_per_1k": -1, "completion_per_1k": 0}}"#)
                .is_err()
        );
        assert!(PricingTable::from_json("not json").is_err());
    }

    #[test]
    fn extend_overrides_existing_prices() {
        let mut table = PricingTable::default();
        table.extend(PricingTable::empty().with_price("llama3-8b-8192", ModelPrice::new(1.0, 2.0)));
        assert_eq!(table.price("llama3-8b-8192").unwrap(), ModelPrice::new(1.0, 2.0));
        assert_eq!(table.models().count(), 2);
    }
}
