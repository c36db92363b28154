//! Large file uploads
//!
//! A large file is sent over several requests: `b2_start_large_file` opens a
//! server-side session, every part gets its own upload URL and request, and
//! `b2_finish_large_file` assembles the parts using their SHA-1 checksums.
//! If any step after the start fails, the session is cancelled so the stored
//! parts do not linger, and the step's error is handed back to the caller.
//!
//! [`LargeFileUpload`] is driven by the caller: each call to
//! [`LargeFileUpload::next_event`] performs one step and reads at most one
//! part of the source into memory.

use crate::api::UploadApi;
use crate::planner::{plan, resolve_size, PartPlan};
use crate::progress::{UploadEvent, UploadProgress};
use crate::source::{read_part, sha1_hex, BoxReader, UploadSource, UploadTarget};
use crate::types::{FileVersion, UploadPartResponse};
use crate::{ClientError, Result};
use futures::Stream;
use tracing::{debug, info, warn};

/// A part stored by the service
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartResult {
    /// 1-based part number
    pub part_number: u32,
    /// SHA-1 the service computed for the part
    pub content_sha1: String,
    /// Bytes stored
    pub content_length: u64,
    /// Upload time in milliseconds since the epoch
    pub upload_timestamp: u64,
}

impl From<&UploadPartResponse> for PartResult {
    fn from(response: &UploadPartResponse) -> Self {
        Self {
            part_number: response.part_number,
            content_sha1: response.content_sha1.clone(),
            content_length: response.content_length,
            upload_timestamp: response.upload_timestamp,
        }
    }
}

/// Client-side record of an open large file
#[derive(Clone, Debug)]
pub struct LargeFileSession {
    file_id: String,
    bucket_id: String,
    file_name: String,
    parts: Vec<PartResult>,
}

impl LargeFileSession {
    fn new(file: &FileVersion) -> Self {
        Self {
            file_id: file.file_id.clone(),
            bucket_id: file.bucket_id.clone(),
            file_name: file.file_name.clone(),
            parts: Vec::new(),
        }
    }

    /// Id of the unfinished file
    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    /// Bucket holding the file
    pub fn bucket_id(&self) -> &str {
        &self.bucket_id
    }

    /// Name of the file
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Parts stored so far, in part order
    pub fn parts(&self) -> &[PartResult] {
        &self.parts
    }

    /// Part number the next stored part must carry
    fn next_part_number(&self) -> u32 {
        self.parts.len() as u32 + 1
    }

    /// Append a stored part; parts must arrive as 1, 2, 3, ...
    fn record(&mut self, part: PartResult) -> Result<()> {
        let expected = self.next_part_number();
        if part.part_number != expected {
            return Err(ClientError::Protocol(format!(
                "expected part {} of file {}, got part {}",
                expected, self.file_id, part.part_number
            )));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Checksums for `b2_finish_large_file`
    fn part_sha1s(&self) -> Vec<String> {
        self.parts.iter().map(|p| p.content_sha1.clone()).collect()
    }
}

enum State {
    Idle,
    /// `b2_start_large_file` sent, no answer yet
    Starting,
    Uploading(LargeFileSession),
    /// A step on this file is awaiting the service
    InFlight { file_id: String },
    Completed,
    Failed,
}

/// One large file upload, consumed one step at a time.
///
/// The upload cannot be restarted: once it completed or failed,
/// [`next_event`](Self::next_event) keeps returning `Ok(None)`.
pub struct LargeFileUpload<'a, A: ?Sized> {
    api: &'a A,
    target: UploadTarget,
    plan: PartPlan,
    reader: Option<BoxReader>,
    state: State,
    progress: UploadProgress,
    cancel_error: Option<ClientError>,
}

impl<'a, A: UploadApi + ?Sized> LargeFileUpload<'a, A> {
    /// Prepare a large file upload.
    ///
    /// Sizes the source, plans the parts and opens the source. No request is
    /// sent until the first [`next_event`](Self::next_event).
    pub async fn new(
        api: &'a A,
        source: UploadSource,
        target: UploadTarget,
        part_size: u64,
    ) -> Result<Self> {
        let size = resolve_size(&source).await?;
        let plan = plan(size, part_size)?;
        let reader = source.open().await?;
        Self::from_reader(api, reader, target, plan)
    }

    pub(crate) fn from_reader(
        api: &'a A,
        reader: BoxReader,
        target: UploadTarget,
        plan: PartPlan,
    ) -> Result<Self> {
        if !plan.is_multipart() {
            return Err(ClientError::Config(format!(
                "{} bytes fit in one part of {} bytes, use a single upload",
                plan.total_size, plan.part_size
            )));
        }

        Ok(Self {
            api,
            target,
            plan,
            reader: Some(reader),
            state: State::Idle,
            progress: UploadProgress::new(plan.total_size, plan.part_count),
            cancel_error: None,
        })
    }

    /// The part layout of this upload
    pub fn plan(&self) -> &PartPlan {
        &self.plan
    }

    /// Progress so far
    pub fn progress(&self) -> UploadProgress {
        self.progress
    }

    /// The open large file, while parts are being uploaded
    pub fn session(&self) -> Option<&LargeFileSession> {
        match &self.state {
            State::Uploading(session) => Some(session),
            _ => None,
        }
    }

    /// Error returned by the cancel call after a failed step, if it failed too
    pub fn cancel_error(&self) -> Option<&ClientError> {
        self.cancel_error.as_ref()
    }

    /// Perform the next step of the upload.
    ///
    /// Returns one `PartUploaded` event per part, then `Completed`, then
    /// `None`. On failure the large file is cancelled and the failing step's
    /// error is returned.
    ///
    /// If a previous call was dropped before it resolved, the part it was
    /// sending is unaccounted for: the upload fails with
    /// [`ClientError::Protocol`] and the large file is cancelled.
    pub async fn next_event(&mut self) -> Result<Option<UploadEvent>> {
        let mut session = match std::mem::replace(&mut self.state, State::Starting) {
            State::Idle => match self.start().await {
                Ok(session) => session,
                Err(e) => {
                    self.fail();
                    return Err(e);
                }
            },
            State::Uploading(session) => session,
            State::Starting => {
                self.fail();
                warn!(file_name = %self.target.file_name, "Large file start was interrupted, the file id is unknown");
                return Err(ClientError::Protocol(
                    "start of the large file was interrupted".to_string(),
                ));
            }
            State::InFlight { file_id } => {
                self.fail();
                let e = ClientError::Protocol(format!("a step on large file {} was interrupted", file_id));
                self.cancel(&file_id, &e).await;
                return Err(e);
            }
            done @ (State::Completed | State::Failed) => {
                self.state = done;
                return Ok(None);
            }
        };

        self.state = State::InFlight {
            file_id: session.file_id.clone(),
        };
        match self.step(&mut session).await {
            Ok(event @ UploadEvent::PartUploaded { .. }) => {
                self.state = State::Uploading(session);
                Ok(Some(event))
            }
            Ok(event @ UploadEvent::Completed { .. }) => {
                self.reader = None;
                self.state = State::Completed;
                Ok(Some(event))
            }
            Err(e) => {
                self.fail();
                self.cancel(&session.file_id, &e).await;
                Err(e)
            }
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

    async fn start(&mut self) -> Result<LargeFileSession> {
        let file = self.api.start_large_file(&self.target).await?;
        info!(
            file_id = %file.file_id,
            file_name = %self.target.file_name,
            parts = self.plan.part_count,
            "Started large file"
        );
        Ok(LargeFileSession::new(&file))
    }

    async fn step(&mut self, session: &mut LargeFileSession) -> Result<UploadEvent> {
        let total_parts = self.plan.part_count;
        let part_number = session.next_part_number();

        if part_number > total_parts {
            let file = self
                .api
                .finish_large_file(&session.file_id, &session.part_sha1s())
                .await?;
            info!(file_id = %file.file_id, parts = total_parts, "Finished large file");
            return Ok(UploadEvent::Completed {
                response: file,
                total_parts,
            });
        }

        let len = self.plan.part_len(part_number);
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| ClientError::Protocol("upload source already closed".to_string()))?;
        let data = read_part(reader, len).await?;
        let sha1 = sha1_hex(&data);

        let url = self.api.get_upload_part_url(&session.file_id).await?;
        debug!(part_number, total_parts, len, "Uploading part");
        let response = self.api.upload_part(&url, part_number, data, &sha1).await?;
        session.record(PartResult::from(&response))?;
        self.progress.advance(part_number, len);

        Ok(UploadEvent::PartUploaded {
            part_number,
            total_parts,
            response,
        })
    }

    /// Enter the terminal failed state and release the source
    fn fail(&mut self) {
        self.state = State::Failed;
        self.reader = None;
    }

    async fn cancel(&mut self, file_id: &str, cause: &ClientError) {
        warn!(file_id, error = %cause, "Large file upload failed, cancelling");
        match self.api.cancel_large_file(file_id).await {
            Ok(_) => debug!(file_id, "Cancelled large file"),
            Err(e) => {
                warn!(file_id, error = %e, "Failed to cancel large file");
                self.cancel_error = Some(e);
            }
        }
    }
}

impl<A: ?Sized> Drop for LargeFileUpload<'_, A> {
    fn drop(&mut self) {
        let file_id = match &self.state {
            State::Uploading(session) => &session.file_id,
            State::InFlight { file_id } => file_id,
            _ => return,
        };
        warn!(
            file_id = %file_id,
            "Large file upload dropped before finishing, the unfinished file is left on the server"
        );
    }
}
