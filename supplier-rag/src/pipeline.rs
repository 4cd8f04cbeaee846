//! Question-answering orchestrator.
//!
//! The [`RagPipeline`] runs one query end to end: retrieve → build prompt →
//! generate → evaluate → price. It holds only immutable collaborators, so a
//! single pipeline behind an `Arc` can serve concurrent queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use supplier_rag::{ContractIndex, IndexConfig, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .retriever(Arc::new(ContractIndex::build(&IndexConfig::default(), &rows)?))
//!     .chat_service(Arc::new(OpenAICompatibleClient::from_env()?))
//!     .build()?;
//!
//! let record = pipeline.answer("Which suppliers are high risk?", "llama3-8b-8192").await?;
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::RagConfig;
use crate::cost::PricingTable;
use crate::error::{RagError, Result};
use crate::evaluator::{Relevance, RelevanceEvaluator, Verdict};
use crate::llm::{ChatService, Generator, TokenUsage};
use crate::prompt::PromptBuilder;
use crate::search::{Filter, Retriever, SearchQuery, SearchResult};

/// The final output of one query.
///
/// Serialises to a flat layout: generation usage as `prompt_tokens` etc.,
/// evaluation usage as `eval_prompt_tokens` etc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub model_used: String,
    /// Wall-clock seconds from retrieval start to evaluation end.
    pub response_time: f64,
    pub relevance: Relevance,
    pub relevance_explanation: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub eval_prompt_tokens: u64,
    pub eval_completion_tokens: u64,
    pub eval_total_tokens: u64,
    /// Combined cost of the generation and evaluation calls.
    pub total_cost: f64,
    /// Model that judged relevance.
    pub evaluation_model: String,
    /// Identifiers of the records placed in the prompt, in ranking order.
    pub sources: Vec<String>,
    /// Degraded-path notes (unparseable evaluation, unpriced model).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AnswerRecord {
    pub fn usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            total_tokens: self.total_tokens,
        }
    }

    pub fn eval_usage(&self) -> TokenUsage {
        TokenUsage {
            prompt_tokens: self.eval_prompt_tokens,
            completion_tokens: self.eval_completion_tokens,
            total_tokens: self.eval_total_tokens,
        }
    }
}

/// The RAG orchestrator. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Arc<dyn Retriever>,
    generator: Generator,
    evaluator: RelevanceEvaluator,
    prompt_builder: PromptBuilder,
    pricing: PricingTable,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    /// Retrieval only, with the configured `min_score` applied.
    pub fn retrieve(&self, query: &SearchQuery) -> Vec<SearchResult> {
        let min_score = self.config.min_score;
        self.retriever.search(query).into_iter().filter(|r| r.score >= min_score).collect()
    }

    /// Answer `question` with `model`, searching the whole dataset with the
    /// configured `top_k`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Upstream`] if either completion call fails.
    pub async fn answer(&self, question: &str, model: &str) -> Result<AnswerRecord> {
        let query = SearchQuery::new(question).with_limit(self.config.top_k);
        self.answer_query(&query, model).await
    }

    /// Answer `question` with the configured default model, restricted by
    /// `filter`.
    pub async fn answer_filtered(&self, question: &str, filter: Filter) -> Result<AnswerRecord> {
        let query =
            SearchQuery::new(question).with_filter(filter).with_limit(self.config.top_k);
        self.answer_query(&query, &self.config.default_model).await
    }

    /// Answer with full control over the retrieval query. `query.text` is
    /// also the question put to the model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Upstream`] if either completion call fails. An
    /// unparseable evaluation or an unpriced model degrades the record
    /// instead of failing.
    #[instrument(skip_all, fields(model = %model, limit = query.limit))]
    pub async fn answer_query(&self, query: &SearchQuery, model: &str) -> Result<AnswerRecord> {
        let started = Instant::now();
        let question = query.text.as_str();

        // 1. Retrieve
        let results = self.retrieve(query);

        // 2. Build the grounding prompt
        let prompt = self.prompt_builder.build(question, &results);

        // 3. Generate the answer
        let generation = self.generator.complete(&prompt, model).await?;

        // 4. Judge its relevance
        let evaluation_model = self.config.evaluation_model_for(model).to_string();
        let (verdict, eval_generation) =
            self.evaluator.evaluate(question, &generation.answer, &evaluation_model).await?;

        let response_time = started.elapsed().as_secs_f64();

        // 5. Price both calls
        let answer_cost = self.pricing.cost(model, generation.usage);
        let eval_cost = self.pricing.cost(&evaluation_model, eval_generation.usage);

        let mut warnings = Vec::new();
        if let Verdict::Fallback { error, .. } = &verdict {
            warnings.push(error.to_string());
        }
        for report in [&answer_cost, &eval_cost] {
            if let Some(error) = &report.lookup_error {
                if !warnings.iter().any(|w| w == &error.to_string()) {
                    warnings.push(error.to_string());
                }
            }
        }

        let evaluation = verdict.into_evaluation();
        let record = AnswerRecord {
            answer: generation.answer,
            model_used: model.to_string(),
            response_time,
            relevance: evaluation.relevance,
            relevance_explanation: evaluation.explanation,
            prompt_tokens: generation.usage.prompt_tokens,
            completion_tokens: generation.usage.completion_tokens,
            total_tokens: generation.usage.total_tokens,
            eval_prompt_tokens: eval_generation.usage.prompt_tokens,
            eval_completion_tokens: eval_generation.usage.completion_tokens,
            eval_total_tokens: eval_generation.usage.total_tokens,
            total_cost: answer_cost.amount + eval_cost.amount,
            evaluation_model,
            sources: results.iter().map(|r| r.record.id.clone()).collect(),
            warnings,
        };

        info!(
            source_count = record.sources.len(),
            relevance = %record.relevance,
            total_tokens = record.total_tokens.saturating_add(record.eval_total_tokens),
            total_cost = record.total_cost,
            response_time = record.response_time,
            "query answered"
        );

        Ok(record)
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `retriever` and `chat_service` are required; everything else has a
/// default.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    retriever: Option<Arc<dyn Retriever>>,
    chat_service: Option<Arc<dyn ChatService>>,
    prompt_builder: Option<PromptBuilder>,
    pricing: Option<PricingTable>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the retrieval backend, usually a
    /// [`ContractIndex`](crate::index::ContractIndex).
    pub fn retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    /// Set the completion service used for both generation and evaluation.
    pub fn chat_service(mut self, service: Arc<dyn ChatService>) -> Self {
        self.chat_service = Some(service);
        self
    }

    pub fn prompt_builder(mut self, builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(builder);
        self
    }

    /// Set the price table. Defaults to [`PricingTable::default()`].
    pub fn pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = Some(pricing);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let retriever =
            self.retriever.ok_or_else(|| RagError::Config("retriever is required".to_string()))?;
        let chat_service = self
            .chat_service
            .ok_or_else(|| RagError::Config("chat_service is required".to_string()))?;

        let generator = Generator::new(chat_service);
        Ok(RagPipeline {
            config: self.config.unwrap_or_default(),
            retriever,
            evaluator: RelevanceEvaluator::new(generator.clone()),
            generator,
            prompt_builder: self.prompt_builder.unwrap_or_default(),
            pricing: self.pricing.unwrap_or_default(),
        })
    }
}
