//! Upload sources and destinations

use crate::types::AUTO_CONTENT_TYPE;
use crate::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Boxed byte stream the uploads read from
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Where the bytes of an upload come from
pub enum UploadSource {
    /// A file on the local filesystem, opened for the duration of the upload
    Path(PathBuf),
    /// An already-open stream; the size must be declared to upload it
    Reader {
        /// The stream
        reader: BoxReader,
        /// Total number of bytes the stream will yield
        size: Option<u64>,
    },
}

impl UploadSource {
    /// Upload a file from disk
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    /// Upload from an open stream
    pub fn reader<R>(reader: R, size: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Reader {
            reader: Box::new(reader),
            size,
        }
    }

    /// Upload an in-memory buffer
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let size = data.len() as u64;
        Self::reader(Cursor::new(data), Some(size))
    }

    /// Local path, when the source is a file
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(path) => Some(path),
            Self::Reader { .. } => None,
        }
    }

    /// Open the source for reading
    pub(crate) async fn open(self) -> Result<BoxReader> {
        match self {
            Self::Path(path) => {
                let file = tokio::fs::File::open(&path).await?;
                Ok(Box::new(file))
            }
            Self::Reader { reader, .. } => Ok(reader),
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Reader { size, .. } => f.debug_struct("Reader").field("size", size).finish_non_exhaustive(),
        }
    }
}

/// Destination of an upload
#[derive(Clone, Debug)]
pub struct UploadTarget {
    /// Bucket receiving the file
    pub bucket_id: String,
    /// Name of the file in the bucket
    pub file_name: String,
    /// MIME type, `b2/x-auto` lets the service guess
    pub content_type: String,
    /// Custom file info, sent as `X-Bz-Info-*` headers or `fileInfo`
    pub file_info: HashMap<String, String>,
}

impl UploadTarget {
    /// Create a target with an automatic content type
    pub fn new(bucket_id: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            bucket_id: bucket_id.into(),
            file_name: file_name.into(),
            content_type: AUTO_CONTENT_TYPE.to_string(),
            file_info: HashMap::new(),
        }
    }

    /// Set the content type
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Add custom file info
    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.file_info.insert(key.into(), value.into());
        self
    }

    /// Record the local modification time, in milliseconds since the epoch
    pub fn with_last_modified(self, millis: u64) -> Self {
        self.with_info("src_last_modified_millis", millis.to_string())
    }
}

/// Read exactly `len` bytes from the source
pub(crate) async fn read_part(reader: &mut BoxReader, len: u64) -> Result<Bytes> {
    let capacity = usize::try_from(len).map_err(|_| {
        io::Error::new(io::ErrorKind::InvalidInput, "part does not fit in memory")
    })?;
    let mut buf = Vec::with_capacity(capacity);
    let read = reader.take(len).read_to_end(&mut buf).await?;
    if read as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("source ended after {} of {} bytes", read, len),
        )
        .into());
    }
    Ok(Bytes::from(buf))
}

/// Lowercase hex SHA-1 of a payload, as sent in `X-Bz-Content-Sha1`
pub(crate) fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}
