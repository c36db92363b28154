//! In-memory `UploadApi` that records every call

use crate::api::UploadApi;
use crate::source::{sha1_hex, UploadTarget};
use crate::types::{CancelledLargeFile, FileAction, FileVersion, UploadPartResponse, UploadPartUrl, UploadUrl};
use crate::{ClientError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

const FILE_ID: &str = "4_zlarge_f1";

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    GetUploadUrl,
    UploadFile { file_name: String, len: u64, sha1: String },
    Start { file_name: String },
    GetPartUrl,
    UploadPart { part_number: u32, len: u64, sha1: String },
    Finish { sha1s: Vec<String> },
    Cancel { file_id: String },
}

#[derive(Default)]
pub(crate) struct FakeApi {
    pub fail_start: bool,
    pub stall_start: bool,
    pub fail_part: Option<u32>,
    pub stall_part: Option<u32>,
    pub misnumber_part: Option<u32>,
    pub fail_finish: bool,
    pub fail_cancel: bool,
    pub calls: Mutex<Vec<Call>>,
}

fn remote(code: &str) -> ClientError {
    ClientError::Remote {
        status: 503,
        code: code.to_string(),
        message: format!("{} injected by test", code),
    }
}

fn file_version(file_id: &str, target_name: &str, len: u64) -> FileVersion {
    FileVersion {
        file_id: file_id.to_string(),
        file_name: target_name.to_string(),
        account_id: "acc".to_string(),
        bucket_id: "bucket-1".to_string(),
        action: Some(FileAction::Upload),
        content_length: len,
        content_sha1: None,
        content_md5: None,
        content_type: None,
        file_info: HashMap::new(),
        upload_timestamp: 1_600_000_000_000,
    }
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(*c)).count()
    }

    pub fn finish_sha1s(&self) -> Option<Vec<String>> {
        self.calls().into_iter().find_map(|c| match c {
            Call::Finish { sha1s } => Some(sha1s),
            _ => None,
        })
    }

    pub fn uploaded_sha1s(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UploadPart { sha1, .. } => Some(sha1),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UploadApi for FakeApi {
    async fn get_upload_url(&self, bucket_id: &str) -> Result<UploadUrl> {
        self.push(Call::GetUploadUrl);
        Ok(UploadUrl {
            bucket_id: bucket_id.to_string(),
            upload_url: "https://pod-000.backblaze.test/b2api/v2/b2_upload_file".to_string(),
            authorization_token: "upload-token".to_string(),
        })
    }

    async fn upload_file(
        &self,
        _url: &UploadUrl,
        target: &UploadTarget,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<FileVersion> {
        assert_eq!(sha1_hex(&data), content_sha1);
        self.push(Call::UploadFile {
            file_name: target.file_name.clone(),
            len: data.len() as u64,
            sha1: content_sha1.to_string(),
        });
        Ok(file_version("4_zsmall_f1", &target.file_name, data.len() as u64))
    }

    async fn start_large_file(&self, target: &UploadTarget) -> Result<FileVersion> {
        self.push(Call::Start {
            file_name: target.file_name.clone(),
        });
        if self.fail_start {
            return Err(remote("start_failed"));
        }
        if self.stall_start {
            std::future::pending::<()>().await;
        }
        Ok(file_version(FILE_ID, &target.file_name, 0))
    }

    async fn get_upload_part_url(&self, file_id: &str) -> Result<UploadPartUrl> {
        self.push(Call::GetPartUrl);
        Ok(UploadPartUrl {
            file_id: file_id.to_string(),
            upload_url: "https://pod-000.backblaze.test/b2api/v2/b2_upload_part".to_string(),
            authorization_token: "part-token".to_string(),
        })
    }

    async fn upload_part(
        &self,
        url: &UploadPartUrl,
        part_number: u32,
        data: Bytes,
        content_sha1: &str,
    ) -> Result<UploadPartResponse> {
        assert_eq!(sha1_hex(&data), content_sha1);
        self.push(Call::UploadPart {
            part_number,
            len: data.len() as u64,
            sha1: content_sha1.to_string(),
        });
        if self.fail_part == Some(part_number) {
            return Err(remote("part_failed"));
        }
        if self.stall_part == Some(part_number) {
            std::future::pending::<()>().await;
        }
        let reported = if self.misnumber_part == Some(part_number) {
            part_number + 1
        } else {
            part_number
        };
        Ok(UploadPartResponse {
            file_id: url.file_id.clone(),
            part_number: reported,
            content_length: data.len() as u64,
            content_sha1: content_sha1.to_string(),
            content_md5: None,
            upload_timestamp: 1_600_000_000_000 + u64::from(part_number),
        })
    }

    async fn finish_large_file(&self, file_id: &str, part_sha1s: &[String]) -> Result<FileVersion> {
        self.push(Call::Finish {
            sha1s: part_sha1s.to_vec(),
        });
        if self.fail_finish {
            return Err(remote("finish_failed"));
        }
        Ok(file_version(file_id, "big.bin", 0))
    }

    async fn cancel_large_file(&self, file_id: &str) -> Result<CancelledLargeFile> {
        self.push(Call::Cancel {
            file_id: file_id.to_string(),
        });
        if self.fail_cancel {
            return Err(remote("cancel_failed"));
        }
        Ok(CancelledLargeFile {
            file_id: file_id.to_string(),
            account_id: "acc".to_string(),
            bucket_id: "bucket-1".to_string(),
            file_name: "big.bin".to_string(),
        })
    }
}

/// In-memory reader that reports when it is dropped
pub(crate) struct TrackedReader {
    inner: io::Cursor<Vec<u8>>,
    released: Arc<AtomicBool>,
}

impl TrackedReader {
    pub fn new(len: u64) -> (Self, Arc<AtomicBool>) {
        let released = Arc::new(AtomicBool::new(false));
        let reader = Self {
            inner: io::Cursor::new(vec![5u8; len as usize]),
            released: released.clone(),
        };
        (reader, released)
    }

    pub fn is_released(flag: &AtomicBool) -> bool {
        flag.load(Ordering::SeqCst)
    }
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}
