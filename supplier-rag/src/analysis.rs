//! Tokenisation and TF-IDF weighting for ranked text search.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Tokens are runs of at least two word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "do", "does", "for", "from", "had", "has", "have", "how", "if", "in", "into", "is",
    "it", "its", "me", "most", "my", "no", "not", "of", "on", "or", "our", "should", "so", "some",
    "than", "that", "the", "their", "them", "there", "these", "they", "this", "those", "to", "us",
    "was", "we", "were", "what", "when", "where", "which", "who", "why", "will", "with", "would",
    "you", "your",
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Split text into lowercase terms with English stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|term| !STOP_SET.contains(*term))
        .map(str::to_string)
        .collect()
}

/// A sparse, L2-normalised term-weight vector keyed by vocabulary index.
///
/// Ordered so that dot products sum in the same order on every build.
pub type SparseVector = BTreeMap<u32, f64>;

/// A TF-IDF model fitted on one text field of the corpus.
///
/// Document vectors are computed once at fit time; queries are projected
/// onto the fitted vocabulary, so terms never seen in the field contribute
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct TfIdfField {
    vocabulary: HashMap<String, u32>,
    idf: Vec<f64>,
    documents: Vec<SparseVector>,
}

impl TfIdfField {
    /// Fit the model over the field text of every document, in order.
    pub fn fit<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let tokenized: Vec<Vec<String>> = texts.into_iter().map(tokenize).collect();
        let n_documents = tokenized.len();

        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut document_frequency: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let mut seen: HashSet<&str> = HashSet::new();
            for token in tokens.iter().filter(|t| seen.insert(t.as_str())) {
                let next = vocabulary.len() as u32;
                let idx = *vocabulary.entry(token.clone()).or_insert(next);
                if idx as usize == document_frequency.len() {
                    document_frequency.push(0);
                }
                document_frequency[idx as usize] += 1;
            }
        }

        // Smoothed idf: ln((N + 1) / (df + 1)) + 1
        let idf = document_frequency
            .iter()
            .map(|&df| ((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0)
            .collect();

        let mut model = Self { vocabulary, idf, documents: Vec::with_capacity(n_documents) };
        let documents = tokenized.iter().map(|tokens| model.weigh(tokens)).collect();
        model.documents = documents;
        model
    }

    /// Project arbitrary text onto the fitted vocabulary.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    /// Cosine similarity between a projected query and document `doc`.
    pub fn similarity(&self, query: &SparseVector, doc: usize) -> f64 {
        let Some(document) = self.documents.get(doc) else {
            return 0.0;
        };
        let (small, large) =
            if query.len() <= document.len() { (query, document) } else { (document, query) };
        small.iter().filter_map(|(term, w)| large.get(term).map(|v| w * v)).sum()
    }

    /// Number of distinct terms in the fitted vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut weights = SparseVector::new();
        for token in tokens {
            if let Some(&idx) = self.vocabulary.get(token) {
                *weights.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        for (idx, weight) in weights.iter_mut() {
            *weight *= self.idf[*idx as usize];
        }
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            weights.values_mut().for_each(|w| *w /= norm);
        }
        weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_lowercases_and_drops_stop_words_and_single_chars() {
        assert_eq!(
            tokenize("Which suppliers are HIGH risk? A b"),
            vec!["suppliers".to_string(), "high".to_string(), "risk".to_string()]
        );
    }

    #[test]
    fn identical_text_scores_one() {
        let model = TfIdfField::fit(["late deliveries", "excellent quality"]);
        let query = model.transform("late deliveries");
        assert!((model.similarity(&query, 0) - 1.0).abs() < 1e-9);
        assert_eq!(model.similarity(&query, 1), 0.0);
    }

    #[test]
    fn unseen_terms_and_out_of_range_docs_score_zero() {
        let model = TfIdfField::fit(["alpha beta"]);
        let query = model.transform("gamma");
        assert!(query.is_empty());
        assert_eq!(model.similarity(&model.transform("alpha"), 5), 0.0);
        assert_eq!(model.vocabulary_size(), 2);
    }

    #[test]
    fn rarer_terms_weigh_more() {
        let model = TfIdfField::fit(["common rare", "common", "common"]);
        let doc = &model.documents[0];
        let common = model.vocabulary["common"];
        let rare = model.vocabulary["rare"];
        assert!(doc[&rare] > doc[&common]);
    }
}
