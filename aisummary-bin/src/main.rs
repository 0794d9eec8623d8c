use std::path::PathBuf;
use std::sync::Arc;

use aisummary_core::{
    config::Config,
    render::{CmarkRenderer, MarkdownRenderer},
    summarizer::{Outcome, Summarizer},
    ui::{ContainerObserver, ContainerSnapshot, SummaryContainer, UiState},
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "AI summary widget smoke tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive one headless summary container against a provisioning endpoint
    Summarize {
        #[arg(long, help = "Provisioning URL normally carried by the summarize control")]
        request_url: String,
        #[arg(long, help = "Anti-forgery token (overrides the config file)")]
        csrf: Option<String>,
        #[arg(long, help = "JSON or TOML config file")]
        config: Option<PathBuf>,
        #[arg(long, default_value = "cli")]
        id: String,
    },
    /// Render markdown the way summaries are rendered
    Render {
        #[arg(short, long)]
        text: String,
    },
}

/// Prints each container update as it is applied.
struct TerminalObserver;

impl ContainerObserver for TerminalObserver {
    fn on_update(&self, container_id: &str, snapshot: &ContainerSnapshot) {
        let tag = match &snapshot.state {
            UiState::Idle => "idle",
            UiState::Loading(_) => "loading",
            UiState::Error(_) => "error",
            UiState::Streaming(_) => "streaming",
            UiState::Done => "done",
        };
        eprintln!(
            "[{container_id}] {tag} disabled={} busy={}",
            snapshot.control_disabled, snapshot.busy
        );
        println!("{}", snapshot.content_html);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize {
            request_url,
            csrf,
            config,
            id,
        } => {
            let mut cfg = match config {
                Some(path) => Config::from_path(&path)?,
                None => Config::default(),
            };
            if let Some(token) = csrf {
                cfg.session.csrf = token;
            }

            let summarizer = Summarizer::new(&cfg)?;
            let container = SummaryContainer::new(id, Some(request_url), cfg.messages.summarize_label.clone())
                .with_observer(Arc::new(TerminalObserver));

            match summarizer.on_summarize_click(&container).await {
                Outcome::Done(provider) => tracing::info!(%provider, "summary complete"),
                other => anyhow::bail!("summary did not complete: {}", other.as_str()),
            }
        }
        Commands::Render { text } => {
            print!("{}", CmarkRenderer::new().render(&text));
        }
    }

    Ok(())
}
