use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use healthoss_core::config::ENDPOINT_ENV;
use healthoss_core::{Config, HttpTransport, Session, Submission};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "healthoss")]
#[command(about = "Chat with the HealthOSS wellness assistant")]
#[command(version)]
struct Cli {
    /// Chat endpoint (overrides HEALTHOSS_ENDPOINT and the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Where to write logs while the chat UI is running
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask one question without opening the chat UI
    Ask {
        /// Your question
        question: String,
    },
    /// Save the chat endpoint to the config file
    SetEndpoint {
        /// Endpoint URL, e.g. http://127.0.0.1:8080/chat
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Ask { question }) => {
            init_stderr_logging();
            let config = resolve_config(cli.endpoint.as_deref())?;
            ask(&config, question).await
        }
        Some(Commands::SetEndpoint { url }) => set_endpoint(&url),
        None => {
            let config = resolve_config(cli.endpoint.as_deref())?;
            let log_path = match cli.log_file {
                Some(path) => path,
                None => default_log_path()?,
            };
            init_file_logging(&log_path)?;
            run_chat(&config).await
        }
    }
}

/// Config file values with the `--endpoint` flag and environment applied.
fn resolve_config(flag: Option<&str>) -> Result<Config> {
    let env_endpoint = std::env::var(ENDPOINT_ENV).ok();
    Ok(Config::load()?.with_endpoint_override(flag, env_endpoint.as_deref()))
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{}=info,healthoss_core=info", env!("CARGO_CRATE_NAME")).into()
    })
}

fn init_stderr_logging() {
    tracing_subscriber::registry()
        .with(default_filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_file_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(default_filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(data_dir.join("healthoss").join("healthoss.log"))
}

fn set_endpoint(url: &str) -> Result<()> {
    // Stored value only; flag and env overrides are not persisted.
    let config = Config::load()?.with_endpoint(url)?;
    config.save()?;
    println!(
        "Saved endpoint {} to {}",
        config.endpoint,
        Config::get_config_path()?.display()
    );
    Ok(())
}

fn connect(config: &Config) -> Session {
    tracing::info!(endpoint = %config.endpoint, "starting chat session");
    Session::new(Arc::new(HttpTransport::new(&config.endpoint)))
}

async fn run_chat(config: &Config) -> Result<()> {
    let session = connect(config);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(session.subscribe());
    let mut app = App::new(session);

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    result
}

async fn ask(config: &Config, question: String) -> Result<()> {
    let session = connect(config);
    session.update_draft(question);

    let outcome = session.submit().await;
    if let Submission::Ignored(_) = outcome {
        bail!("Nothing to ask: the question is empty");
    }

    if let Some(reply) = session.view_state().transcript().last() {
        println!("{}", reply.content);
    }

    if outcome == Submission::Failed {
        bail!("Chat backend at {} did not answer", config.endpoint);
    }
    Ok(())
}
