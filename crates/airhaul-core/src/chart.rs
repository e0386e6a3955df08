//! Chart definition and loading
//!
//! A chart is held fully in memory once loaded, whether it came from a
//! directory on disk or from a packaged `.tgz` downloaded from a repository:
//!
//! ```text
//! mychart/
//!   Chart.yaml
//!   values.yaml
//!   templates/*.yaml   rendered with the values
//!   crds/*.yaml        included as-is
//! ```

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;

use crate::error::{CoreError, Result};
use crate::values::Values;

const CHART_FILE: &str = "Chart.yaml";
const VALUES_FILE: &str = "values.yaml";
const TEMPLATES_DIR: &str = "templates";
const CRDS_DIR: &str = "crds";

/// Chart.yaml contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: Option<String>,

    pub name: String,

    pub version: String,

    #[serde(default)]
    pub app_version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

/// Chart loaded into memory
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub metadata: ChartMetadata,

    /// Default values from values.yaml
    pub values: Values,

    /// Template sources keyed by path relative to templates/
    pub templates: BTreeMap<String, String>,

    /// Raw CRD manifests keyed by path relative to crds/
    pub crds: BTreeMap<String, String>,
}

impl LoadedChart {
    /// Load a chart from a directory
    pub fn load_dir<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref();

        if !root.is_dir() {
            return Err(CoreError::ChartNotFound {
                path: root.display().to_string(),
            });
        }

        let chart_file = root.join(CHART_FILE);
        if !chart_file.exists() {
            return Err(CoreError::InvalidChart {
                message: format!("{} not found in {}", CHART_FILE, root.display()),
            });
        }
        let metadata = parse_metadata(&std::fs::read_to_string(&chart_file)?)?;

        let values_path = root.join(VALUES_FILE);
        let values = if values_path.exists() {
            Values::from_file(&values_path)?
        } else {
            Values::new()
        };

        Ok(Self {
            metadata,
            values,
            templates: read_tree(&root.join(TEMPLATES_DIR))?,
            crds: read_tree(&root.join(CRDS_DIR))?,
        })
    }

    /// Load a chart from a packaged `.tgz`
    ///
    /// Packaged charts nest everything under a single top-level directory
    /// named after the chart; that directory is stripped.
    pub fn from_archive(data: &[u8]) -> Result<Self> {
        let mut archive = Archive::new(GzDecoder::new(data));

        let mut chart_yaml = None;
        let mut values_yaml = None;
        let mut templates = BTreeMap::new();
        let mut crds = BTreeMap::new();

        for entry in archive.entries()? {
            let mut entry = entry?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let path = entry.path()?.into_owned();
            let parts: Vec<String> = path
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy().to_string()),
                    _ => None,
                })
                .collect();

            // Skip the chart directory itself and anything from nested subcharts
            let inner = match parts.as_slice() {
                [_root, rest @ ..] if !rest.is_empty() => rest,
                _ => continue,
            };
            if inner.first().map(String::as_str) == Some("charts") {
                continue;
            }

            let mut content = String::new();
            entry.read_to_string(&mut content)?;

            match inner {
                [file] if file == CHART_FILE => chart_yaml = Some(content),
                [file] if file == VALUES_FILE => values_yaml = Some(content),
                [dir, rest @ ..] if dir == TEMPLATES_DIR && !rest.is_empty() => {
                    templates.insert(rest.join("/"), content);
                }
                [dir, rest @ ..] if dir == CRDS_DIR && !rest.is_empty() => {
                    crds.insert(rest.join("/"), content);
                }
                _ => {}
            }
        }

        let chart_yaml = chart_yaml.ok_or_else(|| CoreError::InvalidChart {
            message: format!("{} not found in archive", CHART_FILE),
        })?;
        let metadata = parse_metadata(&chart_yaml)?;

        let values = match values_yaml {
            Some(yaml) => Values::from_yaml(&yaml)?,
            None => Values::new(),
        };

        Ok(Self {
            metadata,
            values,
            templates,
            crds,
        })
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn version(&self) -> &str {
        &self.metadata.version
    }
}

fn parse_metadata(yaml: &str) -> Result<ChartMetadata> {
    let metadata: ChartMetadata = serde_yaml::from_str(yaml)?;

    if metadata.name.trim().is_empty() {
        return Err(CoreError::MissingField {
            field: "name".to_string(),
        });
    }
    semver::Version::parse(metadata.version.trim_start_matches('v'))?;

    Ok(metadata)
}

/// Read every file below `dir` into a map keyed by relative path
fn read_tree(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();

    if !dir.is_dir() {
        return Ok(files);
    }

    for entry in walkdir::WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let rel = path
            .strip_prefix(dir)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(rel, std::fs::read_to_string(path)?);
    }

    Ok(files)
}
