//! zww-upload entry point.

mod app;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "zww-upload")]
#[command(about = "Upload files to zww object storage")]
#[command(version)]
struct Cli {
    /// Config file path (default: ~/.config/zww/uploader.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name objects after their MD5 and skip files already stored
    #[arg(long)]
    dedup: bool,

    /// Files to upload
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;
    tracing::debug!(endpoint = %config.metadata_endpoint, "configuration loaded");

    let rt = tokio::runtime::Runtime::new()?;
    let all_ok = rt.block_on(app::run(config, cli.files, cli.dedup))?;

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
