//! Error types for the `supplier-rag` crate.

use thiserror::Error;

/// Errors that abort an index build or a query.
///
/// Degraded-but-recoverable conditions are not represented here: see
/// [`EvaluationParseError`](crate::evaluator::EvaluationParseError) and
/// [`CostLookupError`](crate::cost::CostLookupError).
#[derive(Debug, Error)]
pub enum RagError {
    /// The dataset does not satisfy the index schema (missing declared
    /// field, missing or duplicate identifier).
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The completion service failed or returned a malformed response.
    #[error("Upstream error ({provider}): {message}")]
    Upstream {
        /// The service that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream { provider: provider.into(), message: message.into() }
    }

    /// Whether this error came from the completion service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream { .. })
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
