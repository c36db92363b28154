//! The service calls the upload paths are built on

use crate::source::UploadTarget;
use crate::types::{CancelledLargeFile, FileVersion, UploadPartResponse, UploadPartUrl, UploadUrl};
use crate::Result;
use async_trait::async_trait;
use bytes::Bytes;

/// Upload endpoints of the B2 API.
///
/// [`Session`](crate::Session) implements this over HTTP. Each method is a
/// single request; none of them retry.
#[async_trait]
pub trait UploadApi: Send + Sync {
    /// `b2_get_upload_url`
    async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrl>;

    /// `b2_upload_file`: store a whole file in one request
    async fn upload_file(
        &self,
        url: &UploadUrl,
        target: &UploadTarget,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<FileVersion>;

    /// `b2_start_large_file`
    async fn start_large_file(&self, target: &UploadTarget) -> Result<FileVersion>;

    /// `b2_get_upload_part_url`
    async fn get_upload_part_url(&self, file_id: &str) -> Result<UploadPartUrl>;

    /// `b2_upload_part`; part numbers start at 1
    async fn upload_part(
        &self,
        url: &UploadPartUrl,
        part_number: u32,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<UploadPartResponse>;

    /// `b2_finish_large_file`, with the part checksums in part order
    async fn finish_large_file(&self, file_id: &str, part_sha1s: &[String]) -> Result<FileVersion>;

    /// `b2_cancel_large_file`: drop the parts stored so far
    async fn cancel_large_file(&self, file_id: &str) -> Result<CancelledLargeFile>;
}
