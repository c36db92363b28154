//! Uploads of any size
//!
//! [`upload`] picks the transfer for a source: anything that fits in one
//! part is sent with a single `b2_upload_file` request, larger sources go
//! through [`LargeFileUpload`]. Both are consumed through [`Upload`], whose
//! last event is always [`UploadEvent::Completed`] (part number `0`).

use crate::api::UploadApi;
use crate::large_file::LargeFileUpload;
use crate::planner::{plan, resolve_size, PartPlan};
use crate::progress::{UploadEvent, UploadProgress};
use crate::source::{read_part, sha1_hex, BoxReader, UploadSource, UploadTarget};
use crate::types::FileVersion;
use crate::{ClientError, Result};
use futures::Stream;
use tracing::{debug, info};

/// A whole file sent in one request
pub struct SingleUpload<'a, A: ?Sized> {
    api: &'a A,
    target: UploadTarget,
    plan: PartPlan,
    reader: Option<BoxReader>,
    progress: UploadProgress,
}

impl<'a, A: UploadApi + ?Sized> SingleUpload<'a, A> {
    fn new(api: &'a A, reader: BoxReader, target: UploadTarget, plan: PartPlan) -> Self {
        Self {
            api,
            target,
            plan,
            reader: Some(reader),
            progress: UploadProgress::new(plan.total_size, 1),
        }
    }

    /// Send the file; yields `Completed` once, then `None`
    pub async fn next_event(&mut self) -> Result<Option<UploadEvent>> {
        let Some(mut reader) = self.reader.take() else {
            return Ok(None);
        };
        let data = read_part(&mut reader, self.plan.total_size).await?;
        drop(reader);
        let sha1 = sha1_hex(&data);

        let url = self.api.get_upload_url(&self.target.bucket_id).await?;
        debug!(file_name = %self.target.file_name, len = data.len(), "Uploading file");
        let file = self.api.upload_file(&url, &self.target, data, &sha1).await?;
        self.progress.advance(1, self.plan.total_size);
        info!(file_id = %file.file_id, file_name = %file.file_name, "Uploaded file");

        Ok(Some(UploadEvent::Completed {
            response: file,
            total_parts: 1,
        }))
    }
}

/// An upload in progress, either single or large
pub enum Upload<'a, A: ?Sized> {
    /// One request
    Single(SingleUpload<'a, A>),
    /// Large file protocol
    Large(LargeFileUpload<'a, A>),
}

/// Start uploading `source` to `target`, splitting it into `part_size` parts
/// when it does not fit in one.
///
/// Nothing is sent until the first event is pulled. Open streams must
/// declare their size, otherwise this fails with [`ClientError::Config`].
pub async fn upload<'a, A: UploadApi + ?Sized>(
    api: &'a A,
    source: UploadSource,
    target: UploadTarget,
    part_size: u64,
) -> Result<Upload<'a, A>> {
    let size = resolve_size(&source).await?;
    let plan = plan(size, part_size)?;
    let reader = source.open().await?;

    if plan.is_multipart() {
        Ok(Upload::Large(LargeFileUpload::from_reader(api, reader, target, plan)?))
    } else {
        Ok(Upload::Single(SingleUpload::new(api, reader, target, plan)))
    }
}

impl<'a, A: UploadApi + ?Sized> Upload<'a, A> {
    /// Whether the large file protocol is used
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Large(_))
    }

    /// The part layout of this upload
    pub fn plan(&self) -> &PartPlan {
        match self {
            Self::Single(single) => &single.plan,
            Self::Large(large) => large.plan(),
        }
    }

    /// Progress so far
    pub fn progress(&self) -> UploadProgress {
        match self {
            Self::Single(single) => single.progress,
            Self::Large(large) => large.progress(),
        }
    }

    /// Error of the cleanup call after a failed large file step, if that
    /// failed too. Single uploads have nothing to clean up.
    ///
    /// [`into_stream`](Self::into_stream) and [`finish`](Self::finish)
    /// consume the upload; there the cancel failure is only logged.
    pub fn cancel_error(&self) -> Option<&ClientError> {
        match self {
            Self::Single(_) => None,
            Self::Large(large) => large.cancel_error(),
        }
    }

    /// Perform the next step of the upload
    pub async fn next_event(&mut self) -> Result<Option<UploadEvent>> {
        match self {
            Self::Single(single) => single.next_event().await,
            Self::Large(large) => large.next_event().await,
        }
    }

    /// Turn the upload into a stream of events
    pub fn into_stream(self) -> impl Stream<Item = Result<UploadEvent>> + 'a {
        futures::stream::unfold(self, |mut upload| async move {
            match upload.next_event().await {
                Ok(Some(event)) => Some((Ok(event), upload)),
                Ok(None) => None,
                Err(e) => Some((Err(e), upload)),
            }
        })
    }

    /// Run the upload to the end and return the stored file
    pub async fn finish(mut self) -> Result<FileVersion> {
        while let Some(event) = self.next_event().await? {
            if let UploadEvent::Completed { response, .. } = event {
                return Ok(response);
            }
        }
        Err(ClientError::Protocol(
            "upload ended without a completed file".to_string(),
        ))
    }
}
