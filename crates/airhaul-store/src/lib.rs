//! Airhaul content store
//!
//! - **Store**: the persistent reference-to-artifact mapping, backed by a
//!   local directory or kept in memory for tests
//! - **Sync**: dispatch declared content and collection documents into a
//!   freshly flushed store
//! - **Copy**: replay every stored reference into a remote registry
//! - **Extract**: write one stored reference's layers to a directory

pub mod copy;
pub mod document;
pub mod error;
pub mod extract;
pub mod local;
pub mod mock;
pub mod shutdown;
pub mod store;
pub mod sync;

pub use copy::{CopiedArtifact, CopyOptions, copy, copy_to_registry};
pub use document::{RawDocument, parse_documents, read_documents};
pub use error::{Result, StoreError};
pub use extract::{ExtractedArtifact, extract, extract_from_registry};
pub use local::{IndexEntry, LocalStore, StoreConfig};
pub use mock::{MockStore, Operation, OperationCounts};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};
pub use store::{DEFAULT_REGISTRY, Store};
pub use sync::{SyncReport, Syncer};
