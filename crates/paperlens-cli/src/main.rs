use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use paperlens_ai::{EnrichmentClient, resolve_model};
use paperlens_core::error::ExitCode;
use paperlens_core::{AppConfig, PaperId, PaperStore, RelatedWork, SqlitePaperStore};
use paperlens_science::{IngestError, IngestionPipeline, SemanticScholarExplorer};

// ─── CLI Definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "paperlens",
    about = "Ingest research papers: extract, enrich with AI, find related work",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output in JSON format (for scripts).
    /// Also enabled by setting PAPERLENS_JSON=1.
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of the default location.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a PDF through the full pipeline and save the result.
    Ingest {
        file: PathBuf,
        /// Skip the pauses between model calls.
        #[arg(long)]
        no_pacing: bool,
        /// Print the stage report alongside the record.
        #[arg(long)]
        report: bool,
    },

    /// List ingested papers, newest first.
    List {
        #[arg(long, default_value = "50")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Show one ingested paper.
    Show {
        id: String,
        /// Include the extracted full text.
        #[arg(long)]
        full_text: bool,
    },

    /// Ask a question about an ingested paper.
    Ask { id: String, question: String },

    /// Search Semantic Scholar for related papers.
    Related {
        /// Free-text query; ignored when --doi is given.
        query: Option<String>,
        #[arg(long)]
        doi: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

// ─── Config Actions ──────────────────────────────────────────────────────────

#[derive(Subcommand)]
enum ConfigAction {
    /// Show all config values.
    List,
    /// Get a specific config key.
    Get { key: String },
    /// Print the config file path.
    Path,
    /// Write the default config file if none exists.
    Init {
        #[arg(long)]
        force: bool,
    },
}

// ─── Main ────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,paperlens=info")),
        )
        .init();

    let start = Instant::now();
    let cli = Cli::parse();

    // ── Env var overrides ──────────────────────────────────────────────────
    let json_output = cli.json || std::env::var("PAPERLENS_JSON").as_deref() == Ok("1");

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = AppConfig::load_from(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command {
        Commands::Ingest {
            file,
            no_pacing,
            report,
        } => {
            let size = std::fs::metadata(&file)
                .with_context(|| format!("reading {}", file.display()))?
                .len();
            if size > config.upload.max_bytes {
                eprintln!(
                    "{} is {size} bytes; uploads are limited to {} bytes",
                    file.display(),
                    config.upload.max_bytes
                );
                std::process::exit(ExitCode::InvalidArgs as i32);
            }
            let bytes = std::fs::read(&file)?;

            let store: Arc<dyn PaperStore> = Arc::new(open_store(&config)?);
            let pipeline_config = if no_pacing {
                config.pipeline.clone().without_gaps()
            } else {
                config.pipeline.clone()
            };
            let client = EnrichmentClient::new(resolve_model(&config.ai)?);
            tracing::info!(file = %file.display(), size, model = client.model_id(), "ingesting");
            let pipeline = IngestionPipeline::new(
                client,
                Arc::new(SemanticScholarExplorer::new(&config.explorer)?),
                store,
                pipeline_config,
            );

            let outcome = match pipeline.ingest(&bytes).await {
                Ok(outcome) => outcome,
                Err(err @ IngestError::Extraction(_)) => {
                    eprintln!("{err}");
                    std::process::exit(ExitCode::ExtractionError as i32);
                }
                Err(err @ IngestError::Persistence(_)) => {
                    eprintln!("{err}");
                    std::process::exit(ExitCode::StorageError as i32);
                }
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                let mut data = serde_json::json!({ "id": outcome.id, "record": outcome.record });
                if report {
                    data["report"] = serde_json::to_value(&outcome.report)?;
                }
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": data,
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                let record = &outcome.record;
                println!("Saved {}", outcome.id);
                println!("  title:    {}", record.title);
                println!("  authors:  {}", record.authors.join(", "));
                println!("  year:     {}", record.display_year());
                println!("  keywords: {}", record.keywords.join(", "));
                println!("  related:  {} papers", record.related_work.len());
                if report {
                    let stages: Vec<&str> =
                        outcome.report.stages.iter().map(|s| s.as_str()).collect();
                    println!("  stages:   {}", stages.join(" → "));
                    for degraded in &outcome.report.degraded {
                        println!("  degraded: {} ({})", degraded.stage, degraded.reason);
                    }
                }
            }
        }

        Commands::List { limit, offset } => {
            let store = open_store(&config)?;
            let papers = store.list(limit, offset)?;
            let dur = start.elapsed().as_millis();

            if json_output {
                let total = store.count()?;
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": papers, "total": total, "limit": limit, "offset": offset },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if papers.is_empty() {
                println!("No papers yet. Use `paperlens ingest <file.pdf>` to add one.");
            } else {
                for paper in &papers {
                    let authors = paper.authors.join(", ");
                    let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
                    println!(
                        "{id}  {title:<40}  {authors:<25}  {year}",
                        id = &paper.id.to_string()[..8],
                        title = paper.title,
                    );
                }
            }
        }

        Commands::Show { id, full_text } => {
            let store = open_store(&config)?;
            let id = parse_id(&id);
            let Some(mut paper) = store.find_by_id(&id)? else {
                eprintln!("Paper not found: {id}");
                std::process::exit(ExitCode::NotFound as i32);
            };
            if !full_text {
                paper.record.full_text.clear();
            }
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({"status":"ok","data":paper,"meta":{"duration_ms":dur}}))?;
            } else {
                let record = &paper.record;
                println!("{}", record.title);
                println!("{} ({})", record.authors.join(", "), record.display_year());
                println!();
                println!("Abstract:\n{}\n", record.abstract_text);
                println!("Summary:\n{}\n", record.summary);
                println!("Keywords: {}", record.keywords.join(", "));
                if !record.related_work.is_empty() {
                    println!("\nRelated work:");
                    for work in &record.related_work {
                        println!("  {} ({}) {}", work.title, work.year, work.url);
                    }
                }
                if full_text {
                    println!("\nFull text:\n{}", record.full_text);
                }
            }
        }

        Commands::Ask { id, question } => {
            let store = open_store(&config)?;
            let id = parse_id(&id);
            let Some(paper) = store.find_by_id(&id)? else {
                eprintln!("Paper not found: {id}");
                std::process::exit(ExitCode::NotFound as i32);
            };
            let client = EnrichmentClient::new(resolve_model(&config.ai)?);
            let answer = client
                .answer_question(&paper.record.full_text, &question, "")
                .await;
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "id": id, "question": question, "answer": answer },
                    "meta": { "duration_ms": dur }
                }))?;
            } else {
                println!("{answer}");
            }
        }

        Commands::Related { query, doi, limit } => {
            let explorer = SemanticScholarExplorer::new(&config.explorer)?;
            let limit = limit.unwrap_or_else(|| explorer.default_limit());
            let works: Vec<RelatedWork> = match (doi, query) {
                (Some(doi), _) => explorer.find_by_doi(&doi).await.into_iter().collect(),
                (None, Some(query)) => explorer.find_related(&query, limit).await,
                (None, None) => {
                    eprintln!("Give a query or --doi");
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
            };
            let dur = start.elapsed().as_millis();

            if json_output {
                print_json(&serde_json::json!({
                    "status": "ok",
                    "data": { "items": works, "total": works.len() },
                    "meta": { "duration_ms": dur }
                }))?;
            } else if works.is_empty() {
                println!("No related papers found.");
            } else {
                for work in &works {
                    println!("{} ({})", work.title, work.year);
                    println!("  {}", work.authors.join(", "));
                    println!("  {}", work.url);
                }
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::List => {
                let values = config_key_values(&config);
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":values}))?;
                } else {
                    for (key, value) in &values {
                        println!("{key} = {value}");
                    }
                }
            }
            ConfigAction::Get { key } => {
                let values = config_key_values(&config);
                match values.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => {
                        if json_output {
                            print_json(&serde_json::json!({"status":"ok","data":{"key":key,"value":value}}))?;
                        } else {
                            println!("{value}");
                        }
                    }
                    None => {
                        eprintln!("Unknown config key: {key}");
                        std::process::exit(ExitCode::InvalidArgs as i32);
                    }
                }
            }
            ConfigAction::Path => {
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":config_path}}))?;
                } else {
                    println!("{}", config_path.display());
                }
            }
            ConfigAction::Init { force } => {
                if config_path.exists() && !force {
                    eprintln!(
                        "{} already exists; pass --force to overwrite",
                        config_path.display()
                    );
                    std::process::exit(ExitCode::InvalidArgs as i32);
                }
                AppConfig::default().save_to(&config_path)?;
                if json_output {
                    print_json(&serde_json::json!({"status":"ok","data":{"path":config_path}}))?;
                } else {
                    println!("Wrote {}", config_path.display());
                }
            }
        },
    }

    Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn print_json(val: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(val)?);
    Ok(())
}

fn open_store(config: &AppConfig) -> Result<SqlitePaperStore> {
    let db_path = config.database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(SqlitePaperStore::open(&db_path)?)
}

fn parse_id(raw: &str) -> PaperId {
    match raw.parse() {
        Ok(id) => id,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(ExitCode::InvalidArgs as i32);
        }
    }
}

fn config_key_values(config: &AppConfig) -> Vec<(&'static str, String)> {
    vec![
        ("ai.provider", config.ai.provider.clone()),
        ("ai.model", config.ai.model.clone()),
        ("ai.api_key_env", config.ai.api_key_env.clone()),
        ("ai.base_url", config.ai.base_url.clone()),
        ("ai.timeout_secs", config.ai.timeout_secs.to_string()),
        ("explorer.base_url", config.explorer.base_url.clone()),
        ("explorer.api_key_env", config.explorer.api_key_env.clone()),
        ("explorer.timeout_secs", config.explorer.timeout_secs.to_string()),
        ("explorer.max_retries", config.explorer.max_retries.to_string()),
        ("explorer.backoff_base_ms", config.explorer.backoff_base_ms.to_string()),
        ("pipeline.related_work_limit", config.pipeline.related_work_limit.to_string()),
        ("storage.database_path", config.database_path().to_string_lossy().to_string()),
        ("upload.max_bytes", config.upload.max_bytes.to_string()),
    ]
}
