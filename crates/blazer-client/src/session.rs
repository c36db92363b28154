//! Authenticated account state and the B2 API calls

use crate::api::UploadApi;
use crate::client::parse_json;
use crate::source::{UploadSource, UploadTarget};
use crate::types::*;
use crate::upload::{upload, Upload};
use crate::{B2Client, ClientError, Result, API_VERSION};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use tokio::io::AsyncRead;
use tracing::{debug, info, instrument};

/// Delimiter of virtual folders in file names
pub const FOLDER_DELIMITER: char = '/';

#[derive(Clone, Debug)]
struct SelectedBucket {
    id: String,
    name: Option<String>,
}

/// An authorized account.
///
/// Holds the API url and token from `b2_authorize_account` plus the bucket
/// uploads go to. Keys restricted to one bucket select it on creation.
#[derive(Clone, Debug)]
pub struct Session {
    client: B2Client,
    auth: Authorization,
    bucket: Option<SelectedBucket>,
    prefix: String,
}

impl Session {
    pub(crate) fn new(client: B2Client, auth: Authorization) -> Self {
        let bucket = auth.allowed.bucket_id.clone().map(|id| SelectedBucket {
            id,
            name: auth.allowed.bucket_name.clone(),
        });
        let prefix = auth.allowed.name_prefix.clone().unwrap_or_default();

        Self {
            client,
            auth,
            bucket,
            prefix,
        }
    }

    /// The raw authorization response
    pub fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Account id
    pub fn account_id(&self) -> &str {
        &self.auth.account_id
    }

    /// Base URL for downloads
    pub fn download_url(&self) -> &str {
        &self.auth.download_url
    }

    /// Capabilities of the key
    pub fn capabilities(&self) -> &[KeyCapability] {
        &self.auth.allowed.capabilities
    }

    /// Whether the key grants a capability
    pub fn has_capability(&self, capability: KeyCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether the key is restricted to a single bucket
    pub fn is_limited(&self) -> bool {
        self.auth.allowed.bucket_id.is_some() || self.auth.allowed.bucket_name.is_some()
    }

    /// Id of the selected bucket
    pub fn bucket_id(&self) -> Option<&str> {
        self.bucket.as_ref().map(|b| b.id.as_str())
    }

    /// Name of the selected bucket, when known
    pub fn bucket_name(&self) -> Option<&str> {
        self.bucket.as_ref().and_then(|b| b.name.as_deref())
    }

    /// File name prefix the key is restricted to (empty when unrestricted)
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Part size used for large files
    pub fn part_size(&self) -> u64 {
        self.client.config().part_size
    }

    // ==================== Bucket Operations ====================

    /// Select the bucket uploads go to
    #[instrument(skip(self))]
    pub async fn set_bucket(&mut self, bucket_name: &str) -> Result<()> {
        let bucket = self
            .list_buckets(Some(bucket_name))
            .await?
            .into_iter()
            .find(|b| b.bucket_name == bucket_name)
            .ok_or_else(|| ClientError::BucketNotFound(bucket_name.to_string()))?;

        info!(bucket_id = %bucket.bucket_id, "Selected bucket");
        self.bucket = Some(SelectedBucket {
            id: bucket.bucket_id,
            name: Some(bucket.bucket_name),
        });
        Ok(())
    }

    /// List buckets, optionally only the one with the given name
    #[instrument(skip(self))]
    pub async fn list_buckets(&self, bucket_name: Option<&str>) -> Result<Vec<Bucket>> {
        let response: ListBucketsResponse = self
            .api_call(
                "b2_list_buckets",
                &ListBucketsRequest {
                    account_id: &self.auth.account_id,
                    bucket_id: None,
                    bucket_name,
                },
            )
            .await?;
        Ok(response.buckets)
    }

    // ==================== File Operations ====================

    /// Get the stored information of a file
    #[instrument(skip(self))]
    pub async fn get_file_info(&self, file_id: &str) -> Result<FileVersion> {
        self.api_call("b2_get_file_info", &FileIdRequest { file_id }).await
    }

    /// Delete one version of a file; both name and id are required
    #[instrument(skip(self))]
    pub async fn delete_file_version(
        &self,
        file_name: &str,
        file_id: &str,
    ) -> Result<DeletedFileVersion> {
        self.api_call(
            "b2_delete_file_version",
            &DeleteFileVersionRequest { file_name, file_id },
        )
        .await
    }

    // ==================== Uploads ====================

    /// Build a target in the selected bucket, applying the key's name prefix
    pub fn target(&self, file_name: &str) -> Result<UploadTarget> {
        let bucket_id = self.bucket_id().ok_or(ClientError::NoBucketSelected)?;
        let file_name = if file_name.starts_with(&self.prefix) {
            file_name.to_string()
        } else {
            join_name(&self.prefix, file_name)
        };
        Ok(UploadTarget::new(bucket_id, file_name))
    }

    /// Upload any source to any target
    pub async fn upload(&self, source: UploadSource, target: UploadTarget) -> Result<Upload<'_, Self>> {
        upload(self, source, target, self.part_size()).await
    }

    /// Upload a local file into the selected bucket.
    ///
    /// The remote name defaults to the local file name. With
    /// `append_filename`, `file_name` is treated as a folder and the local
    /// file name is appended to it.
    pub async fn upload_path(
        &self,
        path: impl AsRef<Path>,
        file_name: Option<&str>,
        append_filename: bool,
    ) -> Result<Upload<'_, Self>> {
        let path = path.as_ref();
        let local_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ClientError::Config(format!("not a file path: {}", path.display())))?;

        let remote_name = match file_name {
            None => local_name,
            Some(folder) if append_filename => join_name(folder, &local_name),
            Some(name) => name.to_string(),
        };

        let mut target = self.target(&remote_name)?;
        let modified = tokio::fs::metadata(path).await?.modified().ok();
        if let Some(millis) = modified.map(|m| DateTime::<Utc>::from(m).timestamp_millis()) {
            target = target.with_last_modified(millis.max(0) as u64);
        }

        self.upload(UploadSource::path(path), target).await
    }

    /// Upload an open stream of `size` bytes into the selected bucket
    pub async fn upload_reader<R>(&self, reader: R, size: u64, file_name: &str) -> Result<Upload<'_, Self>>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let target = self.target(file_name)?;
        self.upload(UploadSource::reader(reader, Some(size)), target).await
    }

    // ==================== Helper Methods ====================

    fn api_url(&self, endpoint: &str) -> String {
        format!("{}{}/{}", self.auth.api_url, API_VERSION, endpoint)
    }

    async fn api_call<B, T>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.api_url(endpoint);
        debug!("Calling {}", url);

        let response = self
            .client
            .http()
            .post(&url)
            .header(AUTHORIZATION, &self.auth.authorization_token)
            .timeout(self.client.config().timeout)
            .json(body)
            .send()
            .await?;

        parse_json(response).await
    }
}

#[async_trait]
impl UploadApi for Session {
    #[instrument(skip(self))]
    async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrl> {
        self.api_call("b2_get_upload_url", &BucketIdRequest { bucket_id }).await
    }

    #[instrument(skip(self, url, data), fields(file_name = %target.file_name, len = data.len()))]
    async fn upload_file(
        &self,
        url: &UploadUrl,
        target: &UploadTarget,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<FileVersion> {
        let mut req = self
            .client
            .http()
            .post(&url.upload_url)
            .header(AUTHORIZATION, &url.authorization_token)
            .header("X-Bz-File-Name", encode_file_name(&target.file_name))
            .header(CONTENT_TYPE, &target.content_type)
            .header("X-Bz-Content-Sha1", content_sha1);

        for (key, value) in &target.file_info {
            req = req.header(format!("X-Bz-Info-{}", key), urlencoding::encode(value).into_owned());
        }

        let response = req.body(data).send().await?;
        parse_json(response).await
    }

    #[instrument(skip(self), fields(file_name = %target.file_name))]
    async fn start_large_file(&self, target: &UploadTarget) -> Result<FileVersion> {
        self.api_call(
            "b2_start_large_file",
            &StartLargeFileRequest {
                bucket_id: &target.bucket_id,
                file_name: &target.file_name,
                content_type: &target.content_type,
                file_info: &target.file_info,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn get_upload_part_url(&self, file_id: &str) -> Result<UploadPartUrl> {
        self.api_call("b2_get_upload_part_url", &FileIdRequest { file_id }).await
    }

    #[instrument(skip(self, url, data), fields(file_id = %url.file_id, len = data.len()))]
    async fn upload_part(
        &self,
        url: &UploadPartUrl,
        part_number: u32,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<UploadPartResponse> {
        let response = self
            .client
            .http()
            .post(&url.upload_url)
            .header(AUTHORIZATION, &url.authorization_token)
            .header("X-Bz-Part-Number", part_number.to_string())
            .header("X-Bz-Content-Sha1", content_sha1)
            .body(data)
            .send()
            .await?;

        parse_json(response).await
    }

    #[instrument(skip(self, part_sha1s), fields(parts = part_sha1s.len()))]
    async fn finish_large_file(&self, file_id: &str, part_sha1s: &[String]) -> Result<FileVersion> {
        self.api_call(
            "b2_finish_large_file",
            &FinishLargeFileRequest {
                file_id,
                part_sha1_array: part_sha1s,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn cancel_large_file(&self, file_id: &str) -> Result<CancelledLargeFile> {
        self.api_call("b2_cancel_large_file", &FileIdRequest { file_id }).await
    }
}

/// Join a folder and a name with the folder delimiter
fn join_name(folder: &str, name: &str) -> String {
    if folder.is_empty() || folder.ends_with(FOLDER_DELIMITER) {
        format!("{}{}", folder, name)
    } else {
        format!("{}{}{}", folder, FOLDER_DELIMITER, name)
    }
}

/// Percent-encode a file name for `X-Bz-File-Name`, keeping folder slashes
fn encode_file_name(name: &str) -> String {
    urlencoding::encode(name).replace("%2F", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_name() {
        assert_eq!(join_name("backups", "a.tar"), "backups/a.tar");
        assert_eq!(join_name("backups/", "a.tar"), "backups/a.tar");
        assert_eq!(join_name("", "a.tar"), "a.tar");
    }

    #[test]
    fn test_encode_file_name() {
        assert_eq!(encode_file_name("photos/summer 2020/ä.jpg"), "photos/summer%202020/%C3%A4.jpg");
    }
}
