//! Error types for collection discovery

use airhaul_core::CoreError;
use airhaul_engine::EngineError;
use airhaul_repo::RepoError;
use thiserror::Error;

/// Collection discovery errors
#[derive(Debug, Error)]
pub enum CollectionError {
    // ============ Release Bundle Errors ============
    #[error("k3s dependent images not found for {version}")]
    ImagesNotFound { version: String },

    #[error("failed to fetch k3s dependent images: {message}")]
    FetchFailed { message: String },

    #[error("k3s executable not found at {url}")]
    ExecutableNotFound { url: String },

    #[error("desired k3s channel not found: {channel}")]
    ChannelNotFound { channel: String },

    // ============ Values Errors ============
    #[error("get values file {path}: {message}")]
    ValuesFile { path: String, message: String },

    #[error("could not parse values from file {path}: {message}")]
    ValuesParse { path: String, message: String },

    // ============ Path Query Errors ============
    #[error("Invalid path query '{query}': {message}")]
    InvalidQuery { query: String, message: String },

    #[error("Path query '{query}' failed: {message}")]
    QueryFailed { query: String, message: String },

    // ============ Collaborator Errors ============
    #[error(transparent)]
    Render(#[from] EngineError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, CollectionError>;
