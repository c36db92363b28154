//! Splitting uploads into parts

use crate::config::{validate_part_size, MAX_PARTS};
use crate::source::UploadSource;
use crate::{ClientError, Result};

/// How an upload of a given size is split into parts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartPlan {
    /// Total bytes to upload
    pub total_size: u64,
    /// Number of parts, at least 1
    pub part_count: u32,
    /// Size of every part but the last
    pub part_size: u64,
}

impl PartPlan {
    /// Whether the upload needs the large-file protocol
    pub fn is_multipart(&self) -> bool {
        self.part_count > 1
    }

    /// Byte length of a 1-based part
    pub fn part_len(&self, part_number: u32) -> u64 {
        if part_number == 0 || part_number > self.part_count {
            return 0;
        }
        let offset = u64::from(part_number - 1) * self.part_size;
        (self.total_size - offset).min(self.part_size)
    }
}

/// Compute the part layout of an upload.
///
/// An empty upload still has one part. Fails when the part size is outside
/// the service bounds or the upload would need more than 10000 parts.
pub fn plan(total_size: u64, part_size: u64) -> Result<PartPlan> {
    let part_size = validate_part_size(part_size)?;
    let part_count = total_size.div_ceil(part_size).max(1);
    let part_count = u32::try_from(part_count)
        .ok()
        .filter(|count| *count <= MAX_PARTS)
        .ok_or_else(|| {
            ClientError::Config(format!(
                "{} bytes in parts of {} bytes exceeds the {} part limit",
                total_size, part_size, MAX_PARTS
            ))
        })?;

    Ok(PartPlan {
        total_size,
        part_count,
        part_size,
    })
}

/// Determine the total length of a source.
///
/// Files are measured on disk. Streams must declare their size.
pub async fn resolve_size(source: &UploadSource) -> Result<u64> {
    match source {
        UploadSource::Path(path) => Ok(tokio::fs::metadata(path).await?.len()),
        UploadSource::Reader { size: Some(size), .. } => Ok(*size),
        UploadSource::Reader { size: None, .. } => Err(ClientError::Config(
            "the total size must be given when uploading an open stream".to_string(),
        )),
    }
}
