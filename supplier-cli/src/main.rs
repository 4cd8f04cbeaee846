mod cli;
mod dataset;

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use serde_json::json;
use supplier_rag::openai::OpenAICompatibleClient;
use supplier_rag::{
    ChatResponse, ChatService, ContractIndex, IndexConfig, MockChatService, PricingTable, RagConfig,
    RagPipeline, Retriever, SearchQuery,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{AskArgs, Cli, Command, LogFormat, SearchArgs};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let rows = dataset::load_rows(&cli.data)
        .with_context(|| format!("failed to load dataset from {}", cli.data.display()))?;
    let index = ContractIndex::build(&IndexConfig::default(), &rows)?;

    match cli.command {
        Command::Search(args) => search(&index, &args),
        Command::Ask(args) => ask(index, args).await,
    }
}

fn search(index: &ContractIndex, args: &SearchArgs) -> Result<()> {
    let limit = args.retrieval.limit.unwrap_or(RagConfig::default().top_k);
    let query = SearchQuery::new(args.query.as_str())
        .with_filter(args.retrieval.filter())
        .with_limit(limit);

    let hits: Vec<_> = index
        .search(&query)
        .into_iter()
        .map(|hit| {
            json!({
                "id": hit.record.id,
                "score": hit.score,
                "supplier_name": hit.record.supplier_name,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&hits)?);
    Ok(())
}

async fn ask(index: ContractIndex, args: AskArgs) -> Result<()> {
    let mut config = RagConfig::builder();
    if let Some(model) = &args.model {
        config = config.default_model(model);
    }
    if let Some(model) = &args.eval_model {
        config = config.evaluation_model(model);
    }
    if let Some(limit) = args.retrieval.limit {
        config = config.top_k(limit);
    }
    let config = config.build()?;

    let mut pricing = PricingTable::default();
    if let Some(path) = &args.pricing {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read pricing file {}", path.display()))?;
        pricing.extend(PricingTable::from_json(&json)?);
    }

    let chat_service: Arc<dyn ChatService> = if args.dry_run {
        info!("dry run: using canned model responses");
        Arc::new(dry_run_service())
    } else {
        let api_key = args
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("no API key: set GROQ_API_KEY or pass --api-key"))?;
        Arc::new(OpenAICompatibleClient::new(api_key)?.with_base_url(&args.api_base))
    };

    let model = config.default_model.clone();
    let query = SearchQuery::new(args.question.as_str())
        .with_filter(args.retrieval.filter())
        .with_limit(config.top_k);

    let pipeline = RagPipeline::builder()
        .config(config)
        .retriever(Arc::new(index))
        .chat_service(chat_service)
        .pricing(pricing)
        .build()?;

    let record = pipeline.answer_query(&query, &model).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// One canned answer and one canned verdict, enough for a single query.
fn dry_run_service() -> MockChatService {
    MockChatService::new()
        .with_response(ChatResponse::text("(dry run) no model was called", 0, 0))
        .with_response(ChatResponse::text(
            r#"{"Relevance":"NON_RELEVANT","Explanation":"dry run; no model was called"}"#,
            0,
            0,
        ))
}
