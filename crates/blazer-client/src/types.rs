//! Wire types for the B2 JSON API

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Content type asking the service to guess from the file name
pub const AUTO_CONTENT_TYPE: &str = "b2/x-auto";

/// Response of `b2_authorize_account`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Account id
    pub account_id: String,
    /// Token sent with every API call
    pub authorization_token: String,
    /// Base URL for API calls
    pub api_url: String,
    /// Base URL for downloads
    pub download_url: String,
    /// Part size the service recommends (bytes)
    #[serde(default)]
    pub recommended_part_size: Option<u64>,
    /// Smallest part size the service accepts (bytes)
    #[serde(default)]
    pub absolute_minimum_part_size: Option<u64>,
    /// What the key is allowed to do
    #[serde(default)]
    pub allowed: Allowed,
}

/// Restrictions attached to the application key
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allowed {
    /// Capabilities granted to the key
    #[serde(default)]
    pub capabilities: Vec<KeyCapability>,
    /// Bucket the key is restricted to
    #[serde(default)]
    pub bucket_id: Option<String>,
    /// Name of the bucket the key is restricted to
    #[serde(default)]
    pub bucket_name: Option<String>,
    /// File name prefix the key is restricted to
    #[serde(default)]
    pub name_prefix: Option<String>,
}

/// Permission carried by an application key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCapability {
    DeleteBuckets,
    DeleteFiles,
    DeleteKeys,
    ListBuckets,
    ListFiles,
    ListKeys,
    ReadBuckets,
    ReadFiles,
    ShareFiles,
    WriteBuckets,
    WriteFiles,
    WriteKeys,
    /// Capability added by the service after this client was written
    #[serde(other)]
    Other,
}

impl KeyCapability {
    /// Key management capabilities
    pub const KEYS: &'static [KeyCapability] = &[Self::WriteKeys, Self::ListKeys, Self::DeleteKeys];

    /// Bucket management capabilities
    pub const BUCKETS: &'static [KeyCapability] = &[
        Self::WriteBuckets,
        Self::ReadBuckets,
        Self::ListBuckets,
        Self::DeleteBuckets,
    ];

    /// File capabilities
    pub const FILES: &'static [KeyCapability] = &[
        Self::WriteFiles,
        Self::DeleteFiles,
        Self::ListFiles,
        Self::ReadFiles,
        Self::ShareFiles,
    ];

    /// Read-only capabilities
    pub const READ: &'static [KeyCapability] = &[
        Self::ReadBuckets,
        Self::ReadFiles,
        Self::ListBuckets,
        Self::ListFiles,
        Self::ListKeys,
    ];

    /// Write capabilities
    pub const WRITE: &'static [KeyCapability] =
        &[Self::WriteBuckets, Self::WriteFiles, Self::WriteKeys];

    /// Delete capabilities
    pub const DELETE: &'static [KeyCapability] =
        &[Self::DeleteBuckets, Self::DeleteFiles, Self::DeleteKeys];
}

/// Bucket visibility
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketType {
    /// Anybody can download the files
    #[serde(rename = "allPublic")]
    Public,
    /// Downloads need an authorization token
    #[serde(rename = "allPrivate")]
    Private,
    /// Private bucket holding snapshots made on the web site
    #[serde(rename = "snapshot")]
    Snapshot,
    #[serde(other)]
    Unknown,
}

/// A bucket
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Account owning the bucket
    pub account_id: String,
    /// Bucket id
    pub bucket_id: String,
    /// Bucket name
    pub bucket_name: String,
    /// Visibility
    pub bucket_type: BucketType,
    /// User-defined bucket info
    #[serde(default)]
    pub bucket_info: HashMap<String, String>,
    /// Revision counter
    #[serde(default)]
    pub revision: u64,
}

/// Response of `b2_list_buckets`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListBucketsResponse {
    /// Matching buckets
    pub buckets: Vec<Bucket>,
}

/// State of a file version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileAction {
    /// A finished upload
    Upload,
    /// A large file that was started and not finished
    Start,
    /// A hide marker
    Hide,
    /// A virtual folder
    Folder,
}

/// A stored file version, returned by uploads, finish and file info calls
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileVersion {
    /// File id
    pub file_id: String,
    /// File name
    pub file_name: String,
    /// Account id
    #[serde(default)]
    pub account_id: String,
    /// Bucket id
    pub bucket_id: String,
    /// Version state
    #[serde(default)]
    pub action: Option<FileAction>,
    /// Size in bytes
    #[serde(default)]
    pub content_length: u64,
    /// SHA-1 of the content ("none" for large files)
    #[serde(default)]
    pub content_sha1: Option<String>,
    /// MD5 of the content, when known
    #[serde(default)]
    pub content_md5: Option<String>,
    /// MIME type
    #[serde(default)]
    pub content_type: Option<String>,
    /// User-defined file info
    #[serde(default)]
    pub file_info: HashMap<String, String>,
    /// Upload time in milliseconds since the epoch
    #[serde(default)]
    pub upload_timestamp: u64,
}

impl FileVersion {
    /// Upload time as a timestamp
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.upload_timestamp)
    }
}

/// Response of `b2_get_upload_url`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    /// Bucket the URL uploads into
    pub bucket_id: String,
    /// Upload URL
    pub upload_url: String,
    /// Token for the upload URL
    pub authorization_token: String,
}

/// Response of `b2_get_upload_part_url`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartUrl {
    /// Large file the URL uploads into
    pub file_id: String,
    /// Upload URL
    pub upload_url: String,
    /// Token for the upload URL
    pub authorization_token: String,
}

/// Response of `b2_upload_part`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPartResponse {
    /// Large file id
    pub file_id: String,
    /// Part number (1-based)
    pub part_number: u32,
    /// Bytes received
    pub content_length: u64,
    /// SHA-1 of the bytes received
    pub content_sha1: String,
    /// MD5 of the bytes received
    #[serde(default)]
    pub content_md5: Option<String>,
    /// Upload time in milliseconds since the epoch
    #[serde(default)]
    pub upload_timestamp: u64,
}

impl UploadPartResponse {
    /// Upload time as a timestamp
    pub fn uploaded_at(&self) -> Option<DateTime<Utc>> {
        millis_to_datetime(self.upload_timestamp)
    }
}

/// Response of `b2_cancel_large_file`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledLargeFile {
    /// Cancelled file id
    pub file_id: String,
    /// Account id
    #[serde(default)]
    pub account_id: String,
    /// Bucket id
    #[serde(default)]
    pub bucket_id: String,
    /// File name
    #[serde(default)]
    pub file_name: String,
}

/// Response of `b2_delete_file_version`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFileVersion {
    /// Deleted file id
    pub file_id: String,
    /// Deleted file name
    pub file_name: String,
}

// ==================== Request Bodies ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListBucketsRequest<'a> {
    pub account_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BucketIdRequest<'a> {
    pub bucket_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileIdRequest<'a> {
    pub file_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StartLargeFileRequest<'a> {
    pub bucket_id: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    #[serde(skip_serializing_if = "is_empty_map")]
    pub file_info: &'a HashMap<String, String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FinishLargeFileRequest<'a> {
    pub file_id: &'a str,
    pub part_sha1_array: &'a [String],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeleteFileVersionRequest<'a> {
    pub file_name: &'a str,
    pub file_id: &'a str,
}

fn is_empty_map(map: &&HashMap<String, String>) -> bool {
    map.is_empty()
}

fn millis_to_datetime(millis: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(millis).ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_authorization() {
        let json = r#"{
            "accountId": "acc123",
            "authorizationToken": "tok",
            "apiUrl": "https://api001.backblazeb2.com",
            "downloadUrl": "https://f001.backblazeb2.com",
            "recommendedPartSize": 100000000,
            "absoluteMinimumPartSize": 5000000,
            "allowed": {
                "capabilities": ["listBuckets", "writeFiles", "bypassGovernance"],
                "bucketId": "b1",
                "bucketName": "photos",
                "namePrefix": null
            }
        }"#;

        let auth: Authorization = serde_json::from_str(json).unwrap();
        assert_eq!(auth.account_id, "acc123");
        assert_eq!(auth.recommended_part_size, Some(100_000_000));
        assert_eq!(
            auth.allowed.capabilities,
            vec![KeyCapability::ListBuckets, KeyCapability::WriteFiles, KeyCapability::Other]
        );
        assert_eq!(auth.allowed.bucket_name.as_deref(), Some("photos"));
        assert!(auth.allowed.name_prefix.is_none());
    }

    #[test]
    fn test_parse_large_file_version() {
        let json = r#"{
            "accountId": "acc123",
            "action": "upload",
            "bucketId": "b1",
            "contentLength": 10485761,
            "contentSha1": "none",
            "contentType": "application/octet-stream",
            "fileId": "4_z27c88f1d182b150646ff0b16_f200ec6dc2ad1c1b7_d20200101_m000000_c001_v0001000_t0001",
            "fileInfo": {"src_last_modified_millis": "1577836800000"},
            "fileName": "backups/disk.img",
            "uploadTimestamp": 1577836800000
        }"#;

        let file: FileVersion = serde_json::from_str(json).unwrap();
        assert_eq!(file.action, Some(FileAction::Upload));
        assert_eq!(file.content_length, 10_485_761);
        assert_eq!(file.content_sha1.as_deref(), Some("none"));
        assert_eq!(file.uploaded_at().unwrap().timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_bucket_type_unknown() {
        let bucket: Bucket = serde_json::from_str(
            r#"{"accountId":"a","bucketId":"b","bucketName":"n","bucketType":"restricted"}"#,
        )
        .unwrap();
        assert_eq!(bucket.bucket_type, BucketType::Unknown);
    }

    #[test]
    fn test_capability_groups_are_disjoint_by_kind() {
        for cap in KeyCapability::READ {
            assert!(!KeyCapability::WRITE.contains(cap));
            assert!(!KeyCapability::DELETE.contains(cap));
        }
        assert_eq!(KeyCapability::FILES.len(), 5);
    }

    #[test]
    fn test_finish_request_body() {
        let sha1s = vec!["aa".to_string(), "bb".to_string()];
        let body = serde_json::to_value(FinishLargeFileRequest {
            file_id: "f1",
            part_sha1_array: &sha1s,
        })
        .unwrap();
        assert_eq!(body["fileId"], "f1");
        assert_eq!(body["partSha1Array"][1], "bb");
    }
}
