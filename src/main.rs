// ABOUTME: Entry point for the healthlog binary.
// ABOUTME: Parses CLI arguments, initializes tracing, opens the journal, and runs the chat loop or a report command.

mod config;

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use healthlog_agent::{Coordinator, create_classifier};
use healthlog_core::{EntryKind, HealthStore, aggregate, compose_summary};
use healthlog_store::{JOURNAL_FILE, recover_store};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::HealthlogConfig;

#[derive(Parser)]
#[command(name = "healthlog")]
#[command(about = "Personal health journal: log symptoms and medications in plain language", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the journal, one message per line on stdin
    Chat {
        /// Conversation id, for keeping separate clarification threads
        #[arg(long, default_value = "cli")]
        conversation: String,

        /// Print each reply as JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Print the summary for a doctor visit
    Summary {
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// Number of recent medications to list
        #[arg(long)]
        medications: Option<usize>,
    },

    /// Print symptom frequency and average severity
    Patterns {
        /// Only consider the most recent N symptom entries
        #[arg(long)]
        window: Option<usize>,
    },

    /// List stored entries of one kind, oldest first
    Entries {
        #[arg(long)]
        kind: EntryKind,

        /// Only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    Yaml,
}

fn open_store(config: &HealthlogConfig) -> anyhow::Result<Arc<HealthStore>> {
    if !config.persist {
        tracing::info!("persistence disabled, journal lives in memory only");
        return Ok(Arc::new(HealthStore::new()));
    }
    std::fs::create_dir_all(&config.home)
        .with_context(|| format!("creating {}", config.home.display()))?;
    let path = config.home.join(JOURNAL_FILE);
    let store = recover_store(&path).with_context(|| format!("opening {}", path.display()))?;
    Ok(Arc::new(store))
}

async fn chat(
    config: &HealthlogConfig,
    store: Arc<HealthStore>,
    conversation: &str,
    json: bool,
) -> anyhow::Result<()> {
    let classifier = create_classifier(
        &config.classifier,
        config.model.as_deref(),
        &config.classifier_options(),
    )?;
    let coordinator = Coordinator::with_config(
        store,
        classifier,
        config.handler_config(),
        config.session_ttl,
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }

        let reply = coordinator.handle_utterance(conversation, line).await?;
        if json {
            println!("{}", serde_json::to_string(&reply)?);
        } else {
            println!("{}\n", reply.render());
        }
        coordinator.evict_idle_sessions();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("healthlog=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = HealthlogConfig::from_env()?;
    tracing::debug!(home = %config.home.display(), classifier = %config.classifier, "configuration loaded");
    let store = open_store(&config)?;

    match cli.command {
        Commands::Chat { conversation, json } => chat(&config, store, &conversation, json).await?,
        Commands::Summary {
            format,
            medications,
        } => {
            let recent = medications.unwrap_or(config.summary_medications);
            let today = chrono::Local::now().date_naive();
            let summary = store.view(|s, m| compose_summary(s, m, today, recent))?;
            match format {
                Format::Text => print!("{}", summary.text),
                Format::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                Format::Yaml => print!("{}", serde_yaml::to_string(&summary)?),
            }
        }
        Commands::Patterns { window } => {
            let report = aggregate(&store.symptoms(window)?);
            println!("{}", report.describe());
        }
        Commands::Entries { kind, limit } => {
            for entry in store.read(kind, limit)? {
                println!("{}", serde_json::to_string(&entry)?);
            }
        }
    }

    Ok(())
}
