//! Airhaul Engine - Jinja2 chart rendering
//!
//! This crate renders charts the way a client-only dry-run install would:
//! - MiniJinja templates with Helm-style filters (toyaml, quote, nindent, ...)
//! - Chart defaults deep-merged with a values overlay
//! - Rendered manifests split into structured objects for inspection

pub mod engine;
pub mod error;
pub mod filters;
pub mod functions;
pub mod renderer;

pub use engine::{Engine, ReleaseInfo, RenderedChart};
pub use error::{EngineError, Result, TemplateError, TemplateErrorKind};
pub use renderer::ChartRenderer;
