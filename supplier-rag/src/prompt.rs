//! Grounding-prompt assembly.

use crate::error::{RagError, Result};
use crate::record::{SupplierRecord, TextField};
use crate::search::SearchResult;

/// The default contract-advisor template. `{question}` and `{context}` are
/// substituted at render time.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
You're a contract advisor. Answer the QUESTION based on the CONTEXT from our supplier contracts database.
Use only the facts from the CONTEXT when answering the QUESTION.

QUESTION: {question}

CONTEXT:
{context}";

/// Order in which fields appear in each rendered record block.
pub const ENTRY_FIELDS: [TextField; 10] = [
    TextField::SupplierType,
    TextField::SupplierName,
    TextField::RiskLevel,
    TextField::ComplianceIssues,
    TextField::KeyTerms,
    TextField::NegotiateRecommendation,
    TextField::QualityMetrics,
    TextField::PastPerformance,
    TextField::SupplyChainDisruption,
    TextField::CostMetrics,
];

/// Renders retrieved records and a question into a single prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    template: String,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { template: DEFAULT_PROMPT_TEMPLATE.to_string() }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the template lacks the `{question}`
    /// or `{context}` placeholder.
    pub fn with_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in ["{question}", "{context}"] {
            if !template.contains(placeholder) {
                return Err(RagError::Config(format!(
                    "prompt template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// Render one labelled block per result, in ranking order, followed by
    /// the question. An empty result set yields an empty context.
    pub fn build(&self, question: &str, results: &[SearchResult]) -> String {
        let context =
            results.iter().map(|r| render_entry(&r.record)).collect::<Vec<_>>().join("\n\n");
        fill_placeholders(&self.template, &[("{question}", question), ("{context}", &context)])
            .trim()
            .to_string()
    }
}

/// Substitute `{name}` placeholders in a single pass, so placeholder-like
/// text inside the substituted values is never expanded.
pub(crate) fn fill_placeholders(template: &str, values: &[(&str, &str)]) -> String {
    let capacity = template.len() + values.iter().map(|(_, v)| v.len()).sum::<usize>();
    let mut out = String::with_capacity(capacity);
    let mut rest = template;
    'scan: while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        for (placeholder, value) in values {
            if let Some(after) = tail.strip_prefix(placeholder) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = &tail[1..];
    }
    out.push_str(rest);
    out
}

/// Render a single record as a labelled block.
pub fn render_entry(record: &SupplierRecord) -> String {
    ENTRY_FIELDS
        .iter()
        .map(|&field| format!("{}: {}", field.label(), record.field(field)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::record::RawRow;

    fn result(id: &str, name: &str) -> SearchResult {
        let row: RawRow = [("supplier_name".to_string(), Some(name.to_string()))].into();
        SearchResult {
            record: Arc::new(SupplierRecord::from_row(id.into(), "supplier_id", &row)),
            score: 1.0,
        }
    }

    #[test]
    fn entry_lists_every_field_in_order() {
        let block = render_entry(&result("1", "Acme").record);
        let labels: Vec<_> = block.lines().map(|l| l.split(':').next().unwrap()).collect();
        let expected: Vec<_> = ENTRY_FIELDS.iter().map(|f| f.label()).collect();
        assert_eq!(labels, expected);
        assert!(block.contains("Supplier_Name: Acme"));
    }

    #[test]
    fn one_block_per_result_in_ranking_order() {
        let prompt = PromptBuilder::new()
            .build("who is cheapest?", &[result("1", "Acme"), result("2", "Borealis")]);
        assert_eq!(prompt.matches("Supplier_Type:").count(), 2);
        let acme = prompt.find("Supplier_Name: Acme").unwrap();
        let borealis = prompt.find("Supplier_Name: Borealis").unwrap();
        assert!(acme < borealis);
        assert!(prompt.contains("QUESTION: who is cheapest?"));
        assert!(prompt.contains("Cost_Metrics: \n\nSupplier_Type: "));
    }

    #[test]
    fn empty_results_give_empty_context() {
        let prompt = PromptBuilder::new().build("anything?", &[]);
        assert!(prompt.ends_with("CONTEXT:"));
    }

    #[test]
    fn placeholder_text_in_inputs_is_not_expanded() {
        let prompt =
            PromptBuilder::new().build("what is {context}?", &[result("1", "{question} Ltd")]);
        assert!(prompt.contains("QUESTION: what is {context}?"));
        assert!(prompt.contains("Supplier_Name: {question} Ltd"));
    }

    #[test]
    fn custom_template_requires_both_placeholders() {
        assert!(PromptBuilder::with_template("Q: {question}").is_err());
        let builder = PromptBuilder::with_template("{context}\n---\n{question}").unwrap();
        assert!(builder.build("q", &[]).ends_with("---\nq"));
    }
}
