//! Error types for store operations

use airhaul_collection::CollectionError;
use airhaul_core::CoreError;
use airhaul_repo::RepoError;
use thiserror::Error;

/// Store, sync and copy errors
#[derive(Debug, Error)]
pub enum StoreError {
    // ============ Store Errors ============
    #[error("store at {location} is not open")]
    NotOpen { location: String },

    #[error("store index {path} is corrupt: {message}")]
    CorruptIndex { path: String, message: String },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ============ Document Errors ============
    #[error("invalid document {index} in {file}: {message}")]
    InvalidDocument {
        file: String,
        index: usize,
        message: String,
    },

    #[error("unsupported Kind {kind} for {group_version}")]
    UnsupportedKind { kind: String, group_version: String },

    #[error("API group + version {group_version} not yet supported")]
    NotYetSupported { group_version: String },

    #[error("unrecognized content/collection type: {gvk}")]
    UnrecognizedType { gvk: String },

    #[error("add ImageTxt {name} to store: {source}")]
    AddImageTxt {
        name: String,
        #[source]
        source: CollectionError,
    },

    // ============ Operation Errors ============
    #[error("operation cancelled")]
    Cancelled,

    #[error("copy {source_ref} -> {destination}: {message}")]
    CopyFailed {
        source_ref: String,
        destination: String,
        message: String,
    },

    #[error("extract {reference}: {source}")]
    ExtractFailed {
        reference: String,
        #[source]
        source: RepoError,
    },

    // ============ Collaborator Errors ============
    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Repo(#[from] RepoError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type Result<T> = std::result::Result<T, StoreError>;
