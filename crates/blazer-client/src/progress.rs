//! Upload progress events

use crate::types::{FileVersion, UploadPartResponse};

/// One step of an upload, yielded by the upload streams
#[derive(Clone, Debug)]
pub enum UploadEvent {
    /// A part of a large file was stored
    PartUploaded {
        /// 1-based part number
        part_number: u32,
        /// Number of parts in the upload
        total_parts: u32,
        /// Service response for the part
        response: UploadPartResponse,
    },
    /// The file is stored and visible
    Completed {
        /// The finished file
        response: FileVersion,
        /// Number of parts in the upload (1 for single uploads)
        total_parts: u32,
    },
}

impl UploadEvent {
    /// Part number of the event; `0` marks the final event of every upload
    pub fn part_number(&self) -> u32 {
        match self {
            Self::PartUploaded { part_number, .. } => *part_number,
            Self::Completed { .. } => 0,
        }
    }

    /// Number of parts in the upload
    pub fn total_parts(&self) -> u32 {
        match self {
            Self::PartUploaded { total_parts, .. } | Self::Completed { total_parts, .. } => {
                *total_parts
            }
        }
    }

    /// Whether this is the final event
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// The finished file, on the final event
    pub fn file(&self) -> Option<&FileVersion> {
        match self {
            Self::Completed { response, .. } => Some(response),
            Self::PartUploaded { .. } => None,
        }
    }
}

/// Upload progress information
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadProgress {
    /// Bytes uploaded so far
    pub bytes_uploaded: u64,
    /// Total bytes to upload
    pub total_bytes: u64,
    /// Last part stored, 0 before the first one
    pub current_part: u32,
    /// Total number of parts
    pub total_parts: u32,
}

impl UploadProgress {
    pub(crate) fn new(total_bytes: u64, total_parts: u32) -> Self {
        Self {
            total_bytes,
            total_parts,
            ..Default::default()
        }
    }

    pub(crate) fn advance(&mut self, part_number: u32, bytes: u64) {
        self.current_part = part_number;
        self.bytes_uploaded += bytes;
    }

    /// Get percentage complete
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 100.0;
        }
        (self.bytes_uploaded as f64 / self.total_bytes as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        let mut progress = UploadProgress::new(200, 2);
        assert_eq!(progress.percentage(), 0.0);
        progress.advance(1, 50);
        assert_eq!(progress.percentage(), 25.0);
        assert_eq!(UploadProgress::new(0, 1).percentage(), 100.0);
    }
}
