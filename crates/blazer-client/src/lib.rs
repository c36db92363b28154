//! # Blazer Client
//!
//! An async client for Backblaze B2 cloud storage.
//!
//! ## Features
//!
//! - **Sessions**: authorize once, pick a bucket, upload under the key's prefix
//! - **Large Files**: sources bigger than one part use the B2 large file
//!   protocol, one part per step, with the file cancelled on any failure
//! - **Pull-Based Progress**: every upload is driven by the caller, one event
//!   per part, so progress needs no callbacks
//!
//! ## Example
//!
//! ```rust,ignore
//! use blazer_client::{B2Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = B2Client::new(Config::new("key-id", "application-key"))?;
//!     let mut session = client.authenticate().await?;
//!     session.set_bucket("backups").await?;
//!
//!     let mut upload = session.upload_path("disk.img", None, false).await?;
//!     while let Some(event) = upload.next_event().await? {
//!         println!("{:.1}%", upload.progress().percentage());
//!         if let Some(file) = event.file() {
//!             println!("stored as {}", file.file_id);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod api;
mod client;
mod config;
mod error;
mod large_file;
mod planner;
mod progress;
mod session;
mod source;
mod types;
mod upload;

#[cfg(test)]
mod testing;

/// Path prefix of every B2 API call
pub const API_VERSION: &str = "/b2api/v2";

pub use api::UploadApi;
pub use client::B2Client;
pub use config::{
    validate_part_size, Config, DEFAULT_PART_SIZE, MAX_PARTS, MAX_PART_SIZE, MIN_PART_SIZE, ONE_GB,
    ONE_MB,
};
pub use error::{ClientError, Result};
pub use large_file::{LargeFileSession, LargeFileUpload, PartResult};
pub use planner::{plan, resolve_size, PartPlan};
pub use progress::{UploadEvent, UploadProgress};
pub use session::{Session, FOLDER_DELIMITER};
pub use source::{BoxReader, UploadSource, UploadTarget};
pub use types::*;
pub use upload::{upload, SingleUpload, Upload};
