//! Command line argument parsing using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use supplier_rag::Filter;
use supplier_rag::openai::GROQ_API_BASE;

pub const DEFAULT_DATA_PATH: &str = "../Data/supplier_contracts_dataset.csv";

/// Ask questions about supplier contracts
#[derive(Parser, Debug, Clone)]
#[command(name = "supplier-rag")]
#[command(about = "Retrieval-augmented question answering over supplier contracts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct Cli {
    /// Supplier contracts CSV file
    #[arg(long, env = "DATA_PATH", default_value = DEFAULT_DATA_PATH, global = true)]
    pub data: PathBuf,

    /// Log output format (filtering follows RUST_LOG)
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Answer a question and print the answer record as JSON
    Ask(AskArgs),

    /// Rank records for a query without calling a model
    Search(SearchArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AskArgs {
    /// The question to answer
    #[arg(value_name = "QUESTION")]
    pub question: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,

    /// API key for the completion service
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible chat-completions API
    #[arg(long, env = "SUPPLIER_RAG_API_BASE", default_value = GROQ_API_BASE)]
    pub api_base: String,

    /// Model that answers the question
    #[arg(short, long)]
    pub model: Option<String>,

    /// Model that judges relevance (defaults to --model)
    #[arg(long)]
    pub eval_model: Option<String>,

    /// JSON file with additional per-model prices
    #[arg(long, value_name = "PRICING_FILE")]
    pub pricing: Option<PathBuf>,

    /// Use canned responses instead of calling a model
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Query text
    #[arg(value_name = "QUERY")]
    pub query: String,

    #[command(flatten)]
    pub retrieval: RetrievalArgs,
}

/// Options shared by every command that retrieves records.
#[derive(Args, Debug, Clone, Default)]
pub struct RetrievalArgs {
    /// Maximum number of records to retrieve
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Exact-match restriction, repeatable
    #[arg(long = "filter", value_name = "FIELD=VALUE", value_parser = parse_filter_entry)]
    pub filters: Vec<(String, String)>,
}

impl RetrievalArgs {
    pub fn filter(&self) -> Filter {
        self.filters.iter().cloned().collect()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Parse one `field=value` pair. The value may itself contain `=`.
pub fn parse_filter_entry(raw: &str) -> Result<(String, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    Ok((field.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_entry_splits_on_first_equals() {
        assert_eq!(
            parse_filter_entry("risk_level=High").unwrap(),
            ("risk_level".to_string(), "High".to_string())
        );
        assert_eq!(
            parse_filter_entry(" key_terms = a=b ").unwrap(),
            ("key_terms".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_filter_entry("risk_level=").unwrap().1, "");
    }

    #[test]
    fn malformed_filter_entries_are_rejected() {
        assert!(parse_filter_entry("risk_level").is_err());
        assert!(parse_filter_entry("=High").is_err());
    }

    #[test]
    fn repeated_filters_combine() {
        let cli = Cli::try_parse_from([
            "supplier-rag",
            "search",
            "late delivery",
            "--filter",
            "risk_level=High",
            "--filter",
            "supplier_type=Raw Materials",
            "--limit",
            "3",
        ])
        .unwrap();

        let Command::Search(args) = cli.command else { panic!("expected search") };
        assert_eq!(args.query, "late delivery");
        assert_eq!(args.retrieval.limit, Some(3));
        assert_eq!(
            args.retrieval.filter(),
            Filter::new().with("risk_level", "High").with("supplier_type", "Raw Materials")
        );
    }

    #[test]
    fn ask_accepts_models_and_dry_run() {
        let cli = Cli::try_parse_from([
            "supplier-rag",
            "--data",
            "contracts.csv",
            "ask",
            "who is risky?",
            "--model",
            "llama3-8b-8192",
            "--eval-model",
            "judge",
            "--dry-run",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.data, PathBuf::from("contracts.csv"));
        assert_eq!(cli.log_format, LogFormat::Json);
        let Command::Ask(args) = cli.command else { panic!("expected ask") };
        assert_eq!(args.model.as_deref(), Some("llama3-8b-8192"));
        assert_eq!(args.eval_model.as_deref(), Some("judge"));
        assert!(args.dry_run);
        assert!(args.retrieval.filter().is_empty());
    }

    #[test]
    fn bad_filter_fails_parsing() {
        assert!(Cli::try_parse_from(["supplier-rag", "search", "q", "--filter", "nope"]).is_err());
    }
}
