//! Upload generated data to B2 and print every step
//!
//! This demo shows:
//! - Authorizing with an application key
//! - Selecting a bucket
//! - Driving a large file upload one part at a time
//! - Reading back and deleting the stored file
//!
//! Run with:
//! B2_APPLICATION_KEY_ID=... B2_APPLICATION_KEY=... cargo run --example stream_upload -- my-bucket

use blazer_client::{B2Client, Config, UploadEvent, UploadSource, MIN_PART_SIZE};
use bytes::Bytes;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let bucket = std::env::args().nth(1).unwrap_or_else(|| "my-bucket".to_string());
    let config = Config::new(
        std::env::var("B2_APPLICATION_KEY_ID")?,
        std::env::var("B2_APPLICATION_KEY")?,
    )
    .with_part_size(MIN_PART_SIZE)?;

    let client = B2Client::new(config)?;
    let mut session = client.authenticate().await?;
    println!("Authorized account {}", session.account_id());

    session.set_bucket(&bucket).await?;

    // Two and a half parts
    let data: Bytes = (0..MIN_PART_SIZE * 5 / 2).map(|i| (i % 256) as u8).collect();
    let target = session.target("demo/stream_upload.bin")?;
    let mut upload = session.upload(UploadSource::bytes(data), target).await?;

    println!("Uploading {} parts", upload.plan().part_count);
    let mut stored = None;
    while let Some(event) = upload.next_event().await? {
        match event {
            UploadEvent::PartUploaded { part_number, response, .. } => {
                println!("  part {} stored, sha1 {}", part_number, response.content_sha1);
            }
            UploadEvent::Completed { response, .. } => {
                println!("Done: {} ({})", response.file_name, response.file_id);
                stored = Some(response);
            }
        }
    }

    // ==================== Cleanup ====================

    if let Some(file) = stored {
        let info = session.get_file_info(&file.file_id).await?;
        println!("Service reports {} bytes", info.content_length);

        session.delete_file_version(&file.file_name, &file.file_id).await?;
        println!("Deleted {}", file.file_name);
    }

    Ok(())
}
