use std::future::Future;

use anyhow::{Context, bail};
use chrono::Local;
use citycast_core::{Config, QueryOrchestrator, ViewState, orchestrator_from_config};
use clap::{Parser, Subcommand};
use inquire::{InquireError, Password, PasswordDisplayMode, Text};
use tokio::sync::watch;
use tracing::debug;

use crate::render::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "citycast", version, about = "Current weather and a 5-day noon forecast")]
pub struct Cli {
    /// Defaults to `interactive`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure {
        /// Key to store; prompted for when absent.
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Show weather for a place.
    Show {
        /// City or place name.
        place: String,
    },

    /// Show the last successful search, then refresh it.
    Last,

    /// Search repeatedly; an empty search clears the result.
    Interactive,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Interactive) {
            Command::Configure { api_key } => configure(api_key),
            Command::Show { place } => {
                let orch = orchestrator()?;
                let mut rx = orch.subscribe();
                render_while(&mut rx, orch.search(&place)).await;
                Ok(())
            }
            Command::Last => {
                let orch = orchestrator()?;
                let mut rx = orch.subscribe();
                if render_while(&mut rx, orch.restore_last_query()).await.is_none() {
                    print_state(&orch.state());
                }
                Ok(())
            }
            Command::Interactive => interactive(orchestrator()?).await,
        }
    }
}

fn orchestrator() -> anyhow::Result<QueryOrchestrator> {
    let config = Config::load()?;
    debug!(
        base_url = config.base_url(),
        policy = ?config.on_forecast_failure,
        "loaded configuration"
    );
    orchestrator_from_config(&config)
}

fn configure(api_key: Option<String>) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let key = match api_key {
        Some(key) => key,
        None => Password::new("OpenWeather API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()
            .context("Failed to read API key")?,
    };

    let key = key.trim();
    if key.is_empty() {
        bail!("API key must not be empty");
    }

    config.set_api_key(key.to_string());
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn interactive(orch: QueryOrchestrator) -> anyhow::Result<()> {
    let mut rx = orch.subscribe();

    if render_while(&mut rx, orch.restore_last_query()).await.is_none() {
        print_state(&orch.state());
    }

    let mut initial = orch.last_query().load_last_place().map(String::from).unwrap_or_default();

    loop {
        let prefill = std::mem::take(&mut initial);
        let input = tokio::task::spawn_blocking(move || {
            Text::new("Search city...").with_initial_value(&prefill).prompt()
        })
        .await?;

        match input {
            Ok(input) => {
                render_while(&mut rx, orch.search(&input)).await;
            }
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e).context("Failed to read search input"),
        }
    }

    Ok(())
}

/// Drive `fut`, printing every state it publishes along the way.
async fn render_while<F: Future>(rx: &mut watch::Receiver<ViewState>, fut: F) -> F::Output {
    tokio::pin!(fut);

    let output = loop {
        tokio::select! {
            output = &mut fut => break output,
            Ok(()) = rx.changed() => print_state(&rx.borrow_and_update()),
        }
    };

    if rx.has_changed().unwrap_or(false) {
        print_state(&rx.borrow_and_update());
    }

    output
}

fn print_state(state: &ViewState) {
    println!("{}", render(state.result.as_ref(), Local::now().date_naive()));
}
