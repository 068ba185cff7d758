use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cofrin_bot::config::{self, Config};
use cofrin_bot::{
    run_worker, InboundMessage, Job, JobKind, MemoryStore, Pipeline, RestStore, StdoutReply,
    TransactionStore, UnavailableExtractor,
};
use cofrin_oracle::{CompletionClient, EmbeddingClient, RateClient};

#[derive(Parser, Debug)]
#[command(name = "cofrin", version, about = "Assistente financeiro conversacional")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat loop (text pipeline against the real oracle)
    Run {
        /// User id owning the session and the saved records
        #[arg(long, default_value = "dev")]
        user: String,
    },

    /// Run a statement file (OFX/CSV/XLSX) through the extraction pipeline
    Import {
        path: PathBuf,

        #[arg(long, default_value = "dev")]
        user: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default ~/.cofrin/config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { user } => run_chat(user).await,
        Command::Import { path, user } => import_file(path, user).await,
        Command::Config {
            command: ConfigCommand::Init,
        } => config::init_config(),
    }
}

fn build_pipeline(cfg: &Config) -> Result<Arc<Pipeline>> {
    let api_key = std::env::var("OPENAI_API_KEY")
        .context("OPENAI_API_KEY is not set; the oracle needs it")?;

    let oracle = CompletionClient::new(api_key.clone())
        .with_base_url(cfg.oracle.base_url.clone())
        .with_model(cfg.oracle.model.clone());
    let embedder = EmbeddingClient::new(api_key);
    let rates = RateClient::new().with_base_url(cfg.rates.base_url.clone());

    let store: Arc<dyn TransactionStore> = if cfg.store.url.is_empty() {
        info!("no store configured, records stay in memory for this run");
        Arc::new(MemoryStore::new())
    } else {
        let key = std::env::var("COFRIN_STORE_KEY")
            .context("COFRIN_STORE_KEY is not set; the store needs it")?;
        Arc::new(RestStore::new(cfg.store.url.clone(), key).with_table(cfg.store.table.clone()))
    };

    Ok(Arc::new(Pipeline::new(
        Arc::new(oracle),
        Arc::new(embedder),
        Arc::new(rates),
        store,
        Arc::new(UnavailableExtractor),
        cfg.timezone(),
    )))
}

async fn run_chat(user: String) -> Result<()> {
    let cfg = config::load_config()?;
    let pipeline = build_pipeline(&cfg)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(rx, pipeline.clone()));

    println!("Cofrin pronto. Digite sua mensagem (ou \"sair\").");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        if line == "sair" || line == "exit" {
            break;
        }
        pipeline
            .accept(
                InboundMessage::text(user.clone(), line),
                Arc::new(StdoutReply),
                &tx,
            )
            .await?;
    }

    drop(tx);
    worker.await.context("worker task")?;
    Ok(())
}

async fn import_file(path: PathBuf, user: String) -> Result<()> {
    let cfg = config::load_config()?;
    let pipeline = build_pipeline(&cfg)?;

    let bytes = std::fs::read(&path).with_context(|| format!("read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("arquivo")
        .to_string();

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    let kind = match ext.as_str() {
        "ofx" => JobKind::Ofx { bytes },
        "csv" => JobKind::Csv { bytes },
        "xlsx" | "xls" => JobKind::Xlsx { bytes },
        _ => bail!("unsupported file type: {filename} (expected .ofx, .csv, .xlsx)"),
    };

    pipeline
        .process_job(Job {
            user_id: user,
            kind,
            reply: Arc::new(StdoutReply),
        })
        .await;
    Ok(())
}
