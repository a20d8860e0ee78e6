//! CLI entry point for mediafetch.

use std::io::{self, IsTerminal};

use anyhow::{Context, Result, bail};
use clap::Parser;
use mediafetch::config::{
    FileConfig, VerbositySetting, default_output_dir, default_staging_dir, load_default_file_config,
};
use mediafetch::{DownloadOptions, DownloadService, HttpClient};
use tracing::{debug, info, warn};

mod cli;
mod progress;

use cli::{Args, Command, DownloadArgs};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = load_default_file_config()?;

    init_tracing(&args, loaded.config.verbosity);
    debug!(?args, config_path = ?loaded.path, loaded_from_file = loaded.loaded_from_file, "CLI arguments parsed");

    let config = loaded.config;
    let client = HttpClient::with_timeouts(config.connect_timeout_secs(), config.read_timeout_secs())
        .context("Failed to build HTTP client")?;

    match &args.command {
        Command::Download(download) => run_download(&args, download, &config, client).await,
        Command::Inspect { url } => run_inspect(url, &config, client).await,
        Command::Plugins => {
            run_plugins(&config, client);
            Ok(())
        }
    }
}

// Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
fn init_tracing(args: &Args, configured: Option<VerbositySetting>) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => configured.map_or("info", VerbositySetting::filter_directive),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_service(config: &FileConfig, client: HttpClient, download: Option<&DownloadArgs>) -> DownloadService {
    let staging_dir = download
        .and_then(|d| d.staging_dir.clone())
        .or_else(|| config.staging_dir.clone())
        .unwrap_or_else(default_staging_dir);
    DownloadService::with_defaults(client, config.chunk_size(), staging_dir)
}

async fn run_download(
    args: &Args,
    download: &DownloadArgs,
    config: &FileConfig,
    client: HttpClient,
) -> Result<()> {
    let service = build_service(config, client, Some(download));
    let output_dir = download
        .output_dir
        .clone()
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(default_output_dir);
    let options = DownloadOptions {
        selection: download.selection(),
        overwrite: download.overwrite || config.overwrite.unwrap_or(false),
    };

    info!(
        url = %download.url,
        output_dir = %output_dir.display(),
        staging_dir = %service.staging_dir().display(),
        "Mediafetch starting"
    );

    let content = service
        .extract_content(&download.url)
        .await
        .with_context(|| format!("Failed to extract content from '{}'", download.url))?;
    let content = options.selection.apply(content);

    let show_progress = !download.no_progress && !args.quiet && io::stderr().is_terminal();
    let (hook, bar) = progress::progress_hook(show_progress, progress::expected_total(&content));

    let result = service
        .download_selected(&download.url, content, &output_dir, &options, hook)
        .await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let written = result.with_context(|| format!("Failed to download '{}'", download.url))?;

    if written.is_empty() {
        warn!(url = %download.url, "no content was downloaded");
        bail!("No content downloaded from '{}'", download.url);
    }
    for path in &written {
        println!("{}", path.display());
    }
    info!(files = written.len(), "Download complete");
    Ok(())
}

async fn run_inspect(url: &str, config: &FileConfig, client: HttpClient) -> Result<()> {
    let service = build_service(config, client, None);
    let content = service
        .extract_content(url)
        .await
        .with_context(|| format!("Failed to extract content from '{url}'"))?;
    let json = serde_json::to_string_pretty(&content).context("Failed to serialize content")?;
    println!("{json}");
    Ok(())
}

fn run_plugins(config: &FileConfig, client: HttpClient) {
    let service = build_service(config, client, None);
    for plugin in service.plugins().iter() {
        println!("{}\t{}", plugin.name(), plugin.domains().join(", "));
    }
}
