//! LLM-judged relevance of a generated answer.
//!
//! A second completion call classifies the answer. If its reply cannot be
//! parsed, the evaluator degrades to [`Relevance::Unknown`] instead of
//! failing the query; the token usage of that call is still reported.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Result;
use crate::llm::{GenerationResult, Generator};
use crate::prompt::fill_placeholders;

/// Explanation attached to the fallback verdict.
pub const FALLBACK_EXPLANATION: &str = "Failed to parse evaluation";

pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"You are an expert evaluator for a RAG system.
Your task is to analyze the relevance of the generated answer to the given question.
Based on the relevance of the generated answer, you will classify it
as "NON_RELEVANT", "PARTLY_RELEVANT", or "RELEVANT".

Here is the data for evaluation:

Question: {question}
Generated Answer: {answer}

Please analyze the content and context of the generated answer in relation to the question
and provide your evaluation in parsable JSON without using code blocks:

{
  "Relevance": "NON_RELEVANT" | "PARTLY_RELEVANT" | "RELEVANT",
  "Explanation": "[Provide a brief explanation for your evaluation]"
}"#;

/// How well an answer addresses its question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Relevance {
    Relevant,
    PartlyRelevant,
    NonRelevant,
    /// The judge's reply could not be interpreted.
    Unknown,
}

impl Relevance {
    pub fn as_str(self) -> &'static str {
        match self {
            Relevance::Relevant => "RELEVANT",
            Relevance::PartlyRelevant => "PARTLY_RELEVANT",
            Relevance::NonRelevant => "NON_RELEVANT",
            Relevance::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Relevance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relevance category and the judge's reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    #[serde(rename = "Relevance")]
    pub relevance: Relevance,
    #[serde(rename = "Explanation")]
    pub explanation: String,
}

impl Evaluation {
    /// The verdict used when the judge's reply is unusable.
    pub fn fallback() -> Self {
        Self { relevance: Relevance::Unknown, explanation: FALLBACK_EXPLANATION.to_string() }
    }
}

/// Why a judge reply was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationParseError {
    #[error("evaluation is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("evaluation is missing the '{0}' field")]
    MissingField(&'static str),
    #[error("evaluation field '{field}' has an unusable value: {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// Outcome of an evaluation call.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The judge replied with a well-formed verdict.
    Parsed(Evaluation),
    /// The reply was unusable; the fallback verdict applies.
    Fallback { evaluation: Evaluation, error: EvaluationParseError },
}

impl Verdict {
    pub fn evaluation(&self) -> &Evaluation {
        match self {
            Verdict::Parsed(evaluation) | Verdict::Fallback { evaluation, .. } => evaluation,
        }
    }

    pub fn into_evaluation(self) -> Evaluation {
        match self {
            Verdict::Parsed(evaluation) | Verdict::Fallback { evaluation, .. } => evaluation,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Verdict::Fallback { .. })
    }
}

/// Parse a judge reply. Never fails: unusable replies become
/// [`Verdict::Fallback`].
pub fn parse_verdict(text: &str) -> Verdict {
    match parse_evaluation(text) {
        Ok(evaluation) => Verdict::Parsed(evaluation),
        Err(error) => Verdict::Fallback { evaluation: Evaluation::fallback(), error },
    }
}

fn parse_evaluation(text: &str) -> std::result::Result<Evaluation, EvaluationParseError> {
    let value: serde_json::Value = serde_json::from_str(text.trim())
        .map_err(|e| EvaluationParseError::InvalidJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| EvaluationParseError::InvalidJson("expected a JSON object".to_string()))?;

    let relevance = object.get("Relevance").ok_or(EvaluationParseError::MissingField("Relevance"))?;
    let explanation =
        object.get("Explanation").ok_or(EvaluationParseError::MissingField("Explanation"))?;

    let relevance = match relevance.as_str() {
        Some("RELEVANT") => Relevance::Relevant,
        Some("PARTLY_RELEVANT") => Relevance::PartlyRelevant,
        Some("NON_RELEVANT") => Relevance::NonRelevant,
        Some("UNKNOWN") => Relevance::Unknown,
        _ => {
            return Err(EvaluationParseError::InvalidValue {
                field: "Relevance",
                value: relevance.to_string(),
            });
        }
    };
    let explanation = explanation.as_str().ok_or_else(|| EvaluationParseError::InvalidValue {
        field: "Explanation",
        value: explanation.to_string(),
    })?;

    Ok(Evaluation { relevance, explanation: explanation.to_string() })
}

/// Asks a model to classify how relevant an answer is to its question.
#[derive(Debug, Clone)]
pub struct RelevanceEvaluator {
    generator: Generator,
    template: String,
}

impl RelevanceEvaluator {
    pub fn new(generator: Generator) -> Self {
        Self { generator, template: EVALUATION_PROMPT_TEMPLATE.to_string() }
    }

    /// Render the judge prompt.
    pub fn prompt(&self, question: &str, answer: &str) -> String {
        fill_placeholders(&self.template, &[("{question}", question), ("{answer}", answer)])
    }

    /// Evaluate `answer` against `question` using `model` as the judge.
    ///
    /// # Errors
    ///
    /// Only failures of the underlying completion call are returned; an
    /// unparseable reply yields [`Verdict::Fallback`] together with the
    /// usage that call consumed.
    pub async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        model: &str,
    ) -> Result<(Verdict, GenerationResult)> {
        let generation = self.generator.complete(&self.prompt(question, answer), model).await?;
        let verdict = parse_verdict(&generation.answer);

        match &verdict {
            Verdict::Parsed(evaluation) => {
                debug!(model, relevance = %evaluation.relevance, "answer evaluated");
            }
            Verdict::Fallback { error, .. } => {
                warn!(model, error = %error, "could not parse evaluation; relevance is UNKNOWN");
            }
        }
        Ok((verdict, generation))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::{ChatResponse, TokenUsage};
    use crate::mock::MockChatService;

    #[test]
    fn parses_a_well_formed_verdict() {
        let verdict = parse_verdict(r#" {"Relevance": "PARTLY_RELEVANT", "Explanation": "close"} "#);
        assert_eq!(
            verdict,
            Verdict::Parsed(Evaluation {
                relevance: Relevance::PartlyRelevant,
                explanation: "close".into()
            })
        );
    }

    #[test]
    fn unusable_replies_fall_back() {
        let cases = [
            "The answer is relevant.",
            "```json\n{\"Relevance\":\"RELEVANT\",\"Explanation\":\"x\"}\n```",
            r#"["RELEVANT"]"#,
            r#"{"Relevance": "RELEVANT"}"#,
            r#"{"Explanation": "no category"}"#,
            r#"{"Relevance": "MOSTLY", "Explanation": "x"}"#,
            r#"{"Relevance": "RELEVANT", "Explanation": 3}"#,
            "",
        ];
        for text in cases {
            let verdict = parse_verdict(text);
            assert!(verdict.is_fallback(), "expected fallback for {text:?}");
            assert_eq!(verdict.evaluation(), &Evaluation::fallback());
            assert_eq!(verdict.evaluation().explanation, "Failed to parse evaluation");
        }
    }

    #[test]
    fn judge_may_answer_unknown_with_its_own_explanation() {
        let verdict = parse_verdict(r#"{"Relevance": "UNKNOWN", "Explanation": "no context given"}"#);
        assert_eq!(
            verdict,
            Verdict::Parsed(Evaluation {
                relevance: Relevance::Unknown,
                explanation: "no context given".into()
            })
        );
    }

    #[test]
    fn relevance_serializes_screaming_snake_case() {
        assert_eq!(serde_json::to_string(&Relevance::NonRelevant).unwrap(), "\"NON_RELEVANT\"");
        assert_eq!(Relevance::Unknown.to_string(), "UNKNOWN");
    }

    #[test]
    fn prompt_embeds_question_and_answer() {
        let evaluator = RelevanceEvaluator::new(Generator::new(Arc::new(MockChatService::new())));
        let prompt = evaluator.prompt("Who is risky?", "Acme");
        assert!(prompt.contains("Question: Who is risky?"));
        assert!(prompt.contains("Generated Answer: Acme"));
        assert!(prompt.contains("\"Relevance\": \"NON_RELEVANT\" | \"PARTLY_RELEVANT\" | \"RELEVANT\""));
    }

    #[tokio::test]
    async fn fallback_keeps_the_consumed_usage() {
        let mock = MockChatService::new().with_response(ChatResponse::text("not json", 40, 7));
        let evaluator = RelevanceEvaluator::new(Generator::new(Arc::new(mock)));

        let (verdict, generation) = evaluator.evaluate("q", "a", "judge").await.unwrap();
        assert!(verdict.is_fallback());
        assert_eq!(generation.usage, TokenUsage::new(40, 7));
    }

    #[tokio::test]
    async fn upstream_failure_is_fatal() {
        let mock = MockChatService::new().with_failure("unauthorized");
        let evaluator = RelevanceEvaluator::new(Generator::new(Arc::new(mock)));
        assert!(evaluator.evaluate("q", "a", "judge").await.unwrap_err().is_upstream());
    }
}
