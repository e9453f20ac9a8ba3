//! File Uploader CLI
//!
//! Usage: file-uploader [--put] FILE...

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use file_uploader::{Config, TransferRequest, UploadClient, UploadMode};

#[derive(Parser, Debug)]
#[command(name = "file-uploader")]
#[command(about = "Upload files to a file receiver without concurrency", long_about = None)]
struct Cli {
    /// Use PUT instead of POST
    #[arg(long)]
    put: bool,

    /// Files to upload
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "file_uploader=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if cli.files.is_empty() {
        eprintln!("Provide a list of filenames to upload.");
        return ExitCode::FAILURE;
    }

    let request = TransferRequest {
        files: cli.files,
        mode: if cli.put { UploadMode::Raw } else { UploadMode::Multipart },
    };

    match run(request).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Upload failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(request: TransferRequest) -> anyhow::Result<()> {
    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let client = UploadClient::new(&config)?;
    client.run(&request).await?;
    Ok(())
}
