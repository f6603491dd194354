use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docrag_cli::{
    parse_metadata, read_document, render_deletion, render_document, render_documents,
    render_evaluation, render_evaluation_summary, render_health, render_ingest, render_search,
    render_statistics, render_update,
};
use docrag_eval::{
    DEFAULT_CAPACITY, EvaluationHistory, OpenAiJudge, ResponseEvaluator, history_path_from_env,
};
use docrag_rag::{CatalogConfig, DynCatalog, StoreBackend};

#[derive(Parser)]
#[command(name = "docrag")]
#[command(about = "Ingest documents into a vector store and search them", long_about = None)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the collection if it does not exist
    Init,
    /// Check that the vector store is reachable
    Health,
    /// Chunk, embed and store a UTF-8 text file
    Ingest {
        path: PathBuf,
        /// Document name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Page count of the original document
        #[arg(long)]
        pages: Option<u32>,
        /// Extra metadata as key=value; values are parsed as JSON when possible
        #[arg(long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },
    /// Similarity search over stored chunks
    Search {
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// List stored documents
    List,
    /// Show one document with its full chunk texts
    Get { name: String },
    /// Merge metadata into every chunk of a document
    Update {
        name: String,
        #[arg(long = "set", value_name = "KEY=VALUE", required = true)]
        set: Vec<String>,
    },
    /// Delete every chunk of a document
    Delete { name: String },
    /// Collection-wide statistics
    Stats,
    /// Grade an answer against the chunks retrieved for its query
    Evaluate {
        #[arg(long)]
        query: String,
        #[arg(long)]
        response: String,
        /// Number of chunks retrieved as context
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Averages and trend over past evaluations
    EvalSummary,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn emit<T: Serialize>(json: bool, value: &T, render: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", render(value));
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::EvalSummary = cli.command {
        let path = history_path_from_env();
        let summary = EvaluationHistory::load(&path, DEFAULT_CAPACITY)?.summary();
        debug!(path = %path.display(), evaluations = summary.total_evaluations, "loaded evaluation history");
        return emit(cli.json, &summary, render_evaluation_summary);
    }

    let config = CatalogConfig::from_env()?;
    debug!(store = ?config.store, embedding = ?config.embedding, collection = %config.collection, "loaded configuration");

    if config.store == StoreBackend::Memory {
        tracing::warn!("using the in-memory store; nothing persists after this command");
    }

    let catalog = config.build_catalog()?;

    if let Commands::Health = cli.command {
        let target = match config.store {
            StoreBackend::Qdrant => config.qdrant_url.clone(),
            StoreBackend::Memory => "memory".to_string(),
        };
        let result = catalog.store().health_check().await;
        let healthy = result.is_ok();
        if cli.json {
            let status = serde_json::json!({
                "healthy": healthy,
                "store": target,
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print!("{}", render_health(&target, result.map_err(|e| e.to_string())));
        }
        if !healthy {
            bail!("vector store health check failed");
        }
        return Ok(());
    }

    catalog.initialize().await?;
    execute(&catalog, cli.command, cli.json).await
}

async fn execute(catalog: &DynCatalog, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Init | Commands::Health | Commands::EvalSummary => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "collection": catalog.collection(),
                        "dimension": catalog.embedder().dimension(),
                        "model": catalog.embedder().model_name(),
                    }))?
                );
            } else {
                println!(
                    "{} Collection {} ready ({} dimensions, {})",
                    "✅".green(),
                    catalog.collection().bold(),
                    catalog.embedder().dimension(),
                    catalog.embedder().model_name()
                );
            }
        }
        Commands::Ingest {
            path,
            name,
            pages,
            meta,
        } => {
            let mut request = read_document(&path, name.as_deref())?
                .with_metadata(parse_metadata(&meta)?);
            if let Some(pages) = pages {
                request = request.with_page_count(pages);
            }
            let receipt = catalog.ingest(request).await?;
            emit(json, &receipt, render_ingest)?;
        }
        Commands::Search { query, limit } => {
            let results = catalog.search(&query, limit).await?;
            emit(json, &results, |results| render_search(&query, results))?;
        }
        Commands::List => {
            let documents = catalog.list().await?;
            emit(json, &documents, |documents| render_documents(documents))?;
        }
        Commands::Get { name } => match catalog.get(&name).await? {
            Some(document) => emit(json, &document, render_document)?,
            None => bail!("Document not found: {}", name),
        },
        Commands::Update { name, set } => {
            let patch = parse_metadata(&set)?;
            let receipt = catalog.update_metadata(&name, &patch).await?;
            emit(json, &receipt, render_update)?;
        }
        Commands::Delete { name } => {
            let receipt = catalog.delete(&name).await?;
            emit(json, &receipt, render_deletion)?;
        }
        Commands::Stats => {
            let stats = catalog.statistics().await?;
            emit(json, &stats, render_statistics)?;
        }
        Commands::Evaluate {
            query,
            response,
            limit,
        } => {
            let results = catalog.search(&query, limit).await?;
            let contexts: Vec<String> = results.iter().map(|r| r.text.clone()).collect();
            let mut sources: Vec<String> = Vec::new();
            for result in &results {
                if !sources.contains(&result.source) {
                    sources.push(result.source.clone());
                }
            }

            let history_path = history_path_from_env();
            let history = EvaluationHistory::load(&history_path, DEFAULT_CAPACITY)?;
            let evaluator =
                ResponseEvaluator::with_history(Arc::new(OpenAiJudge::from_env()?), history);
            let evaluation = evaluator
                .evaluate(&query, &response, &contexts, &sources)
                .await?;
            evaluator.save_history(&history_path)?;

            let summary = evaluator.summary()?;
            emit(json, &evaluation, |evaluation| {
                format!(
                    "{}{}",
                    render_evaluation(evaluation),
                    render_evaluation_summary(&summary)
                )
            })?;
        }
    }

    Ok(())
}
