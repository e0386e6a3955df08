//! CLI error types with exit code handling
//!
//! Library errors are folded into [`CliError`], which renders through
//! miette and knows the process exit code for each failure class.

use airhaul_collection::CollectionError;
use airhaul_repo::RepoError;
use airhaul_store::StoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A content file is malformed or declares something unsupported
    #[error("{message}")]
    #[diagnostic(code(airhaul::cli::content))]
    Content {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// The store could not be opened, read or written
    #[error("Store error: {message}")]
    #[diagnostic(code(airhaul::cli::store))]
    Store {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A fetch, HEAD check or registry write failed
    #[error("{message}")]
    #[diagnostic(code(airhaul::cli::remote))]
    Remote {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(airhaul::cli::io))]
    Io { message: String },

    #[error("Interrupted")]
    #[diagnostic(code(airhaul::cli::interrupted))]
    Interrupted,

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(airhaul::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Content { .. } => exit_codes::CONTENT_ERROR,
            CliError::Store { .. } => exit_codes::STORE_ERROR,
            CliError::Remote { .. } => exit_codes::REMOTE_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Interrupted => exit_codes::INTERRUPTED,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    fn content(message: String, help: Option<&str>) -> Self {
        Self::Content {
            message,
            help: help.map(String::from),
        }
    }

    fn remote(message: String, help: Option<&str>) -> Self {
        Self::Remote {
            message,
            help: help.map(String::from),
        }
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::InvalidDocument { .. } | StoreError::UnsupportedKind { .. } => {
                CliError::content(message, None)
            }
            StoreError::NotYetSupported { .. } => CliError::content(
                message,
                Some("declare the content with apiVersion content.airhaul.io/v1alpha1 or collection.airhaul.io/v1alpha1"),
            ),
            StoreError::UnrecognizedType { .. } => CliError::content(
                message,
                Some("content documents belong to the content.airhaul.io or collection.airhaul.io groups"),
            ),
            StoreError::AddImageTxt { .. } => CliError::remote(message, None),
            StoreError::NotOpen { .. } => CliError::Store { message, help: None },
            StoreError::CorruptIndex { .. } => CliError::Store {
                message,
                help: Some("run `airhaul store sync` to rebuild the store".to_string()),
            },
            StoreError::Io { .. } => CliError::Io { message },
            StoreError::Cancelled => CliError::Interrupted,
            StoreError::ExtractFailed { .. } => CliError::remote(
                message,
                Some("check that the reference is stored and the store registry is being served"),
            ),
            StoreError::CopyFailed { .. } => CliError::remote(
                message,
                Some("check the registry address, credentials and the --insecure/--plain-http flags"),
            ),
            StoreError::Collection(inner) => inner.into(),
            StoreError::Repo(inner) => inner.into(),
            StoreError::Core(_) => CliError::content(message, None),
        }
    }
}

impl From<CollectionError> for CliError {
    fn from(err: CollectionError) -> Self {
        let message = err.to_string();
        match err {
            CollectionError::ValuesFile { .. }
            | CollectionError::ValuesParse { .. }
            | CollectionError::InvalidQuery { .. }
            | CollectionError::Core(_) => CliError::content(message, None),
            CollectionError::Render(_) => CliError::content(
                message,
                Some("the chart's templates failed to render with the given values"),
            ),
            CollectionError::ImagesNotFound { .. } | CollectionError::ExecutableNotFound { .. } => {
                CliError::remote(message, Some("check that the k3s version exists"))
            }
            CollectionError::Repo(inner) => inner.into(),
            _ => CliError::remote(message, None),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err {
            RepoError::File { .. } => CliError::Io { message },
            RepoError::AuthRequired { .. } | RepoError::AuthFailed { .. } => {
                CliError::remote(message, Some("log in with `docker login` or pass credentials"))
            }
            _ => CliError::remote(message, None),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_kind_is_content_error() {
        let err: CliError = StoreError::UnsupportedKind {
            kind: "Bogus".to_string(),
            group_version: "content.airhaul.io/v1alpha1".to_string(),
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::CONTENT_ERROR);
        assert_eq!(err.to_string(), "unsupported Kind Bogus for content.airhaul.io/v1alpha1");
    }

    #[test]
    fn test_cancelled_is_interrupted() {
        let err: CliError = StoreError::Cancelled.into();
        assert_eq!(err.exit_code(), exit_codes::INTERRUPTED);
    }

    #[test]
    fn test_nested_repo_error() {
        let err: CliError = StoreError::Collection(CollectionError::Repo(RepoError::File {
            path: "images.txt".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        }))
        .into();
        assert_eq!(err.exit_code(), exit_codes::IO_ERROR);
    }

    #[test]
    fn test_extract_failure_is_remote_error() {
        let err: CliError = StoreError::ExtractFailed {
            reference: "localhost:5000/airhaul/install.sh:latest".to_string(),
            source: RepoError::OciError {
                message: "manifest unknown".to_string(),
            },
        }
        .into();
        assert_eq!(err.exit_code(), exit_codes::REMOTE_ERROR);
        assert!(err.to_string().starts_with("extract localhost:5000/airhaul/install.sh:latest:"));
    }
}
