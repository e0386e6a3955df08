//! Image lists from plain text files
//!
//! One image per line. A `# source: <name>` comment tags the images that
//! follow it until the next source comment; other comments and blank lines
//! are skipped:
//!
//! ```text
//! # source: core
//! docker.io/rancher/rancher:v2.8.2
//! # source: monitoring
//! quay.io/prometheus/prometheus:v2.50.1
//! ```

use airhaul_core::{Artifact, ArtifactRef};
use airhaul_repo::HttpClient;

use crate::collection::Contents;
use crate::error::Result;

const SOURCE_PREFIX: &str = "source:";

/// Which tagged sources to keep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// Keep only these sources; empty keeps everything not excluded
    pub include: Vec<String>,
    /// Drop these sources
    pub exclude: Vec<String>,
}

impl SourceFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Whether an image tagged with `source` (if any) is kept
    pub fn accepts(&self, source: Option<&str>) -> bool {
        if let Some(source) = source {
            if self.exclude.iter().any(|s| s == source) {
                return false;
            }
        }
        if self.include.is_empty() {
            return true;
        }
        source.is_some_and(|source| self.include.iter().any(|s| s == source))
    }
}

/// An image list read from a local path or URL
pub struct ImageTxt {
    location: String,
    filter: SourceFilter,
    http: HttpClient,
}

impl ImageTxt {
    pub fn new(location: impl Into<String>, filter: SourceFilter, http: HttpClient) -> Self {
        Self {
            location: location.into(),
            filter,
            http,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub(crate) async fn compute(&self) -> Result<Contents> {
        let data = self.http.open(&self.location).await?;
        let text = String::from_utf8_lossy(&data);

        let mut contents = Contents::new();
        for image in parse_image_list(&text, &self.filter) {
            let reference = ArtifactRef::parse(image)?;
            contents.insert(reference.clone(), Artifact::image(reference));
        }

        tracing::info!(location = %self.location, images = contents.len(), "read image list");
        Ok(contents)
    }
}

/// Image lines of `text` accepted by `filter`, in file order
pub fn parse_image_list<'a>(text: &'a str, filter: &SourceFilter) -> Vec<&'a str> {
    let mut source: Option<&str> = None;
    let mut images = Vec::new();

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if let Some(comment) = line.strip_prefix('#') {
            if let Some(name) = comment.trim().strip_prefix(SOURCE_PREFIX) {
                let name = name.trim();
                source = (!name.is_empty()).then_some(name);
            }
            continue;
        }
        if filter.accepts(source) {
            images.push(line);
        }
    }

    images
}
