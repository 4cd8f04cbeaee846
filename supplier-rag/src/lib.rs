//! # supplier-rag
//!
//! Retrieval-augmented question answering over a supplier-contracts dataset.
//!
//! ## Overview
//!
//! A query flows through five stages:
//!
//! 1. [`ContractIndex`] ranks records by TF-IDF overlap with the question,
//!    optionally restricted by an exact-match [`Filter`].
//! 2. [`PromptBuilder`] renders the hits into a grounding prompt.
//! 3. [`Generator`] sends the prompt to a [`ChatService`] and validates the
//!    answer and its token usage.
//! 4. [`RelevanceEvaluator`] asks a model to judge the answer, falling back
//!    to [`Relevance::Unknown`] when the judgement cannot be parsed.
//! 5. [`PricingTable`] turns both calls' usage into a cost.
//!
//! [`RagPipeline`] sequences the stages and returns an [`AnswerRecord`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use supplier_rag::{ContractIndex, IndexConfig, RagPipeline};
//! use supplier_rag::openai::OpenAICompatibleClient;
//!
//! let index = ContractIndex::build(&IndexConfig::default(), &rows)?;
//! let pipeline = RagPipeline::builder()
//!     .retriever(Arc::new(index))
//!     .chat_service(Arc::new(OpenAICompatibleClient::from_env()?))
//!     .build()?;
//!
//! let record = pipeline.answer("Which suppliers are high risk?", "llama3-8b-8192").await?;
//! println!("{} ({})", record.answer, record.relevance);
//! ```
//!
//! ## Features
//!
//! - `openai` – [`openai::OpenAICompatibleClient`], an HTTP client for Groq
//!   and other OpenAI-compatible chat-completions APIs.

pub mod analysis;
pub mod config;
pub mod cost;
pub mod error;
pub mod evaluator;
pub mod index;
pub mod llm;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod record;
pub mod search;

pub use config::{IndexConfig, IndexConfigBuilder, RagConfig, RagConfigBuilder};
pub use cost::{CostLookupError, CostReport, ModelPrice, PricingTable};
pub use error::{RagError, Result};
pub use evaluator::{Evaluation, EvaluationParseError, Relevance, RelevanceEvaluator, Verdict};
pub use index::ContractIndex;
pub use llm::{ChatRequest, ChatResponse, ChatService, GenerationResult, Generator, TokenUsage};
pub use mock::MockChatService;
pub use pipeline::{AnswerRecord, RagPipeline, RagPipelineBuilder};
pub use prompt::PromptBuilder;
pub use record::{RawRow, SupplierRecord, TextField};
pub use search::{Filter, Retriever, SearchQuery, SearchResult};
