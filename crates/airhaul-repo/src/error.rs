//! Error types for remote operations

use airhaul_core::CoreError;
use thiserror::Error;

/// Remote access errors
#[derive(Debug, Error)]
pub enum RepoError {
    // ============ Transport ============
    #[error("GET {url}: status {status}")]
    HttpError { status: u16, url: String },

    #[error("network error: {message}")]
    NetworkError { message: String },

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} requires authentication")]
    AuthRequired { url: String },

    #[error("access denied: {message}")]
    AuthFailed { message: String },

    // ============ Chart Repositories ============
    #[error("could not parse repository index: {message}")]
    IndexParseError { message: String },

    #[error("chart {name} not found in {repo}")]
    ChartNotFound { name: String, repo: String },

    #[error("chart {name} has no version {version} in {repo}")]
    VersionNotFound {
        name: String,
        version: String,
        repo: String,
    },

    #[error("digest mismatch for {name}: index says {expected}, download is {actual}")]
    IntegrityCheckFailed {
        name: String,
        expected: String,
        actual: String,
    },

    // ============ Registries ============
    #[error("registry error: {message}")]
    OciError { message: String },

    #[error("invalid registry reference {reference}")]
    InvalidOciReference { reference: String },

    #[error("write to registry failed: {message}")]
    OciPushFailed { message: String },

    // ============ Local ============
    #[error("read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decode: {0}")]
    Serialization(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, RepoError>;

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        match e.status() {
            _ if e.is_timeout() => RepoError::Timeout {
                seconds: crate::config::DEFAULT_TIMEOUT_SECS,
            },
            Some(status) => RepoError::HttpError {
                status: status.as_u16(),
                url,
            },
            None if e.is_connect() => RepoError::NetworkError {
                message: format!("connect to {}: {}", url, e),
            },
            None => RepoError::NetworkError {
                message: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(e: serde_json::Error) -> Self {
        RepoError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for RepoError {
    fn from(e: url::ParseError) -> Self {
        RepoError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}
