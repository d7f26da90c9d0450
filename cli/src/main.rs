//! fieldsync: keep a table's fields in line with a JSON manifest.
//!
//! Usage:
//!   fieldsync --manifest fields.json
//!   fieldsync --manifest fields.json --dry-run
//!
//! The access token is read from `FIELDSYNC_ACCESS_TOKEN` unless `--token`
//! is given.

use std::path::PathBuf;
use anyhow::{Context, Result, bail};
use clap::Parser;
use fieldsync_cli::{apply, build_engine, load_manifest, plan};
use tracing::{info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const TOKEN_ENV: &str = "FIELDSYNC_ACCESS_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "fieldsync")]
#[command(about = "Reconcile table fields against a manifest")]
struct Args {
    /// Path to the JSON manifest
    #[arg(short, long)]
    manifest: PathBuf,

    /// Access token (defaults to $FIELDSYNC_ACCESS_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Override the manifest's API base URL
    #[arg(long)]
    api_base_url: Option<String>,

    /// Report planned changes without applying them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();
    match EnvFilter::try_from_default_env() {
        Ok(filter) => subscriber.with_env_filter(filter).init(),
        Err(_) => subscriber.with_max_level(log_level).init(),
    }

    let mut manifest = load_manifest(&args.manifest)?;
    if let Some(url) = args.api_base_url {
        manifest.gateway.api_base_url = url;
    }

    let token = match args.token {
        Some(token) => token,
        None => std::env::var(TOKEN_ENV)
            .with_context(|| format!("No access token: pass --token or set {TOKEN_ENV}"))?,
    };

    let engine = build_engine(&manifest, &token).await;
    info!(table = %manifest.table, fields = manifest.fields.len(), "Loaded manifest");

    if args.dry_run {
        let planned = plan(&engine, &manifest).await?;
        println!("{}", serde_json::to_string_pretty(&planned)?);
        return Ok(());
    }

    let cancel = engine.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing the current field");
            cancel.cancel();
        }
    });

    let batch = apply(&engine, &manifest).await?;
    println!("{}", serde_json::to_string_pretty(&batch)?);

    if !batch.is_complete_success() {
        bail!(
            "{} of {} field(s) failed",
            batch.summary.failed,
            batch.summary.total
        );
    }
    Ok(())
}
