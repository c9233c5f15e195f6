use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    ClientSettings, FetchOrchestrator, HttpUserGateway, UserDataState, UserDataStore,
};
use shared::protocol::ServerRenderedData;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Shows a user's profile and repositories as JSON snapshots.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    username: String,
    /// JSON file with data fetched upstream; skips the initial network fetch.
    #[arg(long)]
    server_data: Option<PathBuf>,
    /// Reload page 1 with this page size before paging.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    per_page: Option<u32>,
    /// Repository pages to visit, in order.
    #[arg(long = "page")]
    pages: Vec<u32>,
    /// Print every committed snapshot instead of only the final one.
    #[arg(long)]
    follow: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = ClientSettings::load().context("failed to load client settings")?;
    let gateway = HttpUserGateway::new(&settings).context("failed to build api gateway")?;
    let store = UserDataStore::for_login(args.username.as_str());
    let orchestrator =
        FetchOrchestrator::with_settings(Arc::new(gateway), store.clone(), &settings);

    let follower = args.follow.then(|| {
        let mut commits = store.subscribe_commits();
        tokio::spawn(async move {
            loop {
                match commits.recv().await {
                    Ok(snapshot) => match serde_json::to_string(&snapshot) {
                        Ok(line) => println!("{line}"),
                        Err(err) => warn!(error = %err, "cli: failed to encode snapshot"),
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "cli: snapshot follower fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    match &args.server_data {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read '{}'", path.display()))?;
            let data: ServerRenderedData = serde_json::from_str(&raw)
                .with_context(|| format!("'{}' is not server-rendered user data", path.display()))?;
            orchestrator.hydrate_from_server_data(data);
        }
        None => orchestrator.load_for_username(args.username.as_str()).await,
    }

    if let Some(per_page) = args.per_page {
        orchestrator.change_per_page(per_page).await;
    }
    for page in &args.pages {
        orchestrator.goto_page(*page).await;
    }

    let snapshot = orchestrator.snapshot();
    drop(orchestrator);
    drop(store);
    match follower {
        Some(handle) => handle.await.context("snapshot follower panicked")?,
        None => println!("{}", serde_json::to_string_pretty(&snapshot)?),
    }

    report_failures(&snapshot)
}

fn report_failures(snapshot: &UserDataState) -> Result<()> {
    match (&snapshot.profile.error, &snapshot.repositories.error) {
        (None, None) => Ok(()),
        (Some(profile), None) => bail!("profile unavailable: {profile}"),
        (None, Some(repositories)) => bail!("repositories unavailable: {repositories}"),
        (Some(profile), Some(repositories)) => {
            bail!("profile unavailable: {profile}; repositories unavailable: {repositories}")
        }
    }
}
