//! Client configuration

use crate::{ClientError, Result};
use std::fmt;
use std::time::Duration;

/// Size of one mebibyte
pub const ONE_MB: u64 = 1024 * 1024;
/// Size of one gibibyte
pub const ONE_GB: u64 = 1024 * ONE_MB;
/// Smallest part accepted for a large file (the last part is exempt)
pub const MIN_PART_SIZE: u64 = 5 * ONE_MB;
/// Largest part accepted for a large file, also the single-upload limit
pub const MAX_PART_SIZE: u64 = 5 * ONE_GB;
/// Default part size, as recommended by Backblaze
pub const DEFAULT_PART_SIZE: u64 = 100 * ONE_MB;
/// Maximum number of parts in one large file
pub const MAX_PARTS: u32 = 10_000;

/// Check that a part size lies within the service bounds
pub fn validate_part_size(size: u64) -> Result<u64> {
    if !(MIN_PART_SIZE..=MAX_PART_SIZE).contains(&size) {
        return Err(ClientError::Config(format!(
            "part size {} is outside [{}, {}] bytes",
            size, MIN_PART_SIZE, MAX_PART_SIZE
        )));
    }
    Ok(size)
}

/// Client configuration
#[derive(Clone)]
pub struct Config {
    /// Authorization endpoint (the API url is returned by authentication)
    pub endpoint: String,
    /// Account id, or key id for non-master application keys
    pub key_id: String,
    /// Secret application key
    pub application_key: String,
    /// Timeout for JSON API calls (upload bodies are not bounded)
    pub timeout: Duration,
    /// Connection establishment timeout, applies to every request
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Part size used for large files (bytes)
    pub part_size: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("endpoint", &self.endpoint)
            .field("key_id", &self.key_id)
            .field("application_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("part_size", &self.part_size)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: "https://api.backblazeb2.com".to_string(),
            key_id: String::new(),
            application_key: String::new(),
            timeout: Duration::from_secs(8),
            connect_timeout: Duration::from_secs(8),
            user_agent: format!("blazer-client/{}", env!("CARGO_PKG_VERSION")),
            part_size: DEFAULT_PART_SIZE,
        }
    }
}

impl Config {
    /// Create a new config with the given credentials
    pub fn new(key_id: impl Into<String>, application_key: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            application_key: application_key.into(),
            ..Default::default()
        }
    }

    /// Point the client at another authorization endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the large-file part size, rejecting sizes outside 5MB..=5GB
    pub fn with_part_size(mut self, part_size: u64) -> Result<Self> {
        self.part_size = validate_part_size(part_size)?;
        Ok(self)
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the authorization URL
    pub fn authorize_url(&self) -> String {
        format!(
            "{}{}/b2_authorize_account",
            self.endpoint.trim_end_matches('/'),
            crate::API_VERSION
        )
    }
}
