//! Airhaul Core - Core types for bundling content into an air-gap store
//!
//! This crate provides the foundational types used throughout Airhaul:
//! - `ArtifactRef`: Normalized reference to a fetchable unit of content
//! - `Artifact`: Image, file or chart package, resolved lazily
//! - `Values`: Configuration values with deep merge support
//! - `LoadedChart`: A chart held in memory, ready to render
//! - `apis`: Declarative content and collection documents

pub mod apis;
pub mod artifact;
pub mod chart;
pub mod error;
pub mod reference;
pub mod values;

pub use artifact::{Artifact, ArtifactKind, ChartArtifact, FileArtifact, ImageArtifact};
pub use chart::{ChartMetadata, LoadedChart};
pub use error::{CoreError, Result};
pub use reference::{ArtifactRef, ParseOptions, DEFAULT_NAMESPACE, DEFAULT_REGISTRY, DEFAULT_TAG};
pub use values::Values;
