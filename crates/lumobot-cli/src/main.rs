use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lumobot_core::bsky::{session_from_config, BskyClient};
use lumobot_core::config::DelayConfig;
use lumobot_core::store::{JsonStateStore, MemoryStateStore, StateStore};
use lumobot_core::{ai, tracing_setup, BotConfig, DispatchOptions, Dispatcher, RunReport};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "lumobot")]
#[command(about = "Answers the owner's Bluesky mentions with a language model")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short, global = true)]
    pretty: bool,

    /// Path to JSON config file (credentials, DIDs, model settings)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process new notifications once and exit
    Run {
        /// Generate replies without posting or marking notifications seen
        #[arg(long)]
        dry_run: bool,

        /// Skip the randomized pause between replies
        #[arg(long)]
        no_delay: bool,
    },

    /// Print the persisted pipeline state
    State,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = tracing_setup::init_tracing() {
        eprintln!("Warning: {:#}", e);
    }

    let result = match cli.command {
        Commands::Run { dry_run, no_delay } => {
            run(cli.config.as_deref(), dry_run, no_delay)
                .await
                .and_then(|report| print_json(&report, cli.pretty))
        }
        Commands::State => show_state(cli.config.as_deref(), cli.pretty),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(config_path: Option<&Path>, dry_run: bool, no_delay: bool) -> Result<RunReport> {
    let config = BotConfig::resolve(config_path)?;

    if config.is_paused() {
        tracing::info!(data_dir = %config.data_dir().display(), "Pause marker present, skipping run");
        let state = JsonStateStore::in_dir(&config.data_dir()).load();
        return Ok(RunReport::paused(state, dry_run, chrono::Utc::now()));
    }

    let http = reqwest::Client::new();
    let session = session_from_config(&http, &config).await?;
    tracing::info!(did = %session.did, handle = %session.handle, "Session ready");

    let feed = BskyClient::new(http.clone(), config.service_url(), session)
        .with_notification_limit(config.notification_limit());
    let model = ai::from_config(&config.llm, http);

    let mut options = DispatchOptions::from_config(&config);
    options.dry_run = dry_run;
    if no_delay {
        options.delay = DelayConfig::none();
    }

    let disk = JsonStateStore::in_dir(&config.data_dir());
    let report = if dry_run {
        let scratch = MemoryStateStore::new(disk.load());
        Dispatcher::new(&feed, model.as_ref(), &scratch, options)
            .run()
            .await?
    } else {
        Dispatcher::new(&feed, model.as_ref(), &disk, options)
            .run()
            .await?
    };
    Ok(report)
}

fn show_state(config_path: Option<&Path>, pretty: bool) -> Result<()> {
    let mut config = match config_path {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;

    let store = JsonStateStore::in_dir(&config.data_dir());
    tracing::debug!(path = %store.path().display(), "Reading state");
    print_json(&store.load(), pretty)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
