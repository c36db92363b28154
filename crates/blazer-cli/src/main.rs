//! Blazer - upload files to Backblaze B2

use anyhow::Context;
use blazer_client::{B2Client, Config, UploadEvent, ONE_MB};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "blazer")]
#[command(about = "Upload files to Backblaze B2, using the large file API for big ones")]
#[command(version)]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Bucket to upload into (not needed for keys limited to one bucket)
    #[arg(short, long, env = "B2_BUCKET")]
    bucket: Option<String>,

    /// Remote file name, defaults to the local file name
    #[arg(short, long)]
    name: Option<String>,

    /// Treat --name as a folder and append the local file name
    #[arg(long, requires = "name")]
    folder: bool,

    /// Part size for large files, in MB
    #[arg(long, default_value = "100", env = "B2_PART_SIZE_MB")]
    part_size: u64,

    /// Application key id
    #[arg(long, env = "B2_APPLICATION_KEY_ID")]
    key_id: String,

    /// Application key
    #[arg(long, env = "B2_APPLICATION_KEY", hide_env_values = true)]
    application_key: String,

    /// Authorization endpoint
    #[arg(long, env = "B2_ENDPOINT")]
    endpoint: Option<String>,

    /// Enable debug logging
    #[arg(short, long, env = "BLAZER_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("blazer={0},blazer_client={0}", log_level).into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = Config::new(args.key_id, args.application_key)
        .with_part_size(args.part_size.saturating_mul(ONE_MB))?;
    if let Some(endpoint) = args.endpoint {
        config = config.with_endpoint(endpoint);
    }

    let client = B2Client::new(config)?;
    let mut session = client.authenticate().await.context("authorization failed")?;

    if let Some(bucket) = &args.bucket {
        session
            .set_bucket(bucket)
            .await
            .with_context(|| format!("cannot use bucket {}", bucket))?;
    } else if let Some(bucket_id) = session.bucket_id() {
        tracing::info!("Using bucket {} of the application key", bucket_id);
    } else {
        anyhow::bail!("no bucket given, pass --bucket or set B2_BUCKET");
    }

    let mut upload = session
        .upload_path(&args.file, args.name.as_deref(), args.folder)
        .await
        .with_context(|| format!("cannot upload {}", args.file.display()))?;

    if upload.is_multipart() {
        tracing::info!(
            "Uploading {} in {} parts of {} bytes",
            args.file.display(),
            upload.plan().part_count,
            upload.plan().part_size
        );
    }

    while let Some(event) = upload.next_event().await? {
        let progress = upload.progress();
        match event {
            UploadEvent::PartUploaded { part_number, total_parts, .. } => {
                println!("part {}/{} ({:.1}%)", part_number, total_parts, progress.percentage());
            }
            UploadEvent::Completed { response, .. } => {
                println!("{} -> {} ({} bytes)", args.file.display(), response.file_name, progress.bytes_uploaded);
                println!("file id: {}", response.file_id);
            }
        }
    }

    Ok(())
}
