//! Airhaul remote access
//!
//! This crate provides everything that talks to the outside world:
//!
//! - **HTTP**: anonymous client and the local-or-remote file opener
//! - **Chart repositories**: Helm-style `index.yaml` lookup and download
//! - **OCI registries**: fetch and write whole objects, pull OCI charts
//! - **Credentials**: explicit basic auth with Docker config fallback

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod index;
pub mod oci;
pub mod source;

pub use config::{HttpConfig, RegistryOptions};
pub use credentials::{DockerConfig, ResolvedCredentials};
pub use error::{RepoError, Result};
pub use http::{HttpClient, Location};
pub use index::{ChartEntry, RepositoryIndex};
pub use oci::{Blob, OciObject, OciRegistry, RegistryClient};
pub use source::{ChartSource, RepositoryChartSource};
