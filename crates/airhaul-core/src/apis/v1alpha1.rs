//! `v1alpha1` content and collection kinds

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::Document;

pub const FILES_KIND: &str = "Files";
pub const IMAGES_KIND: &str = "Images";
pub const CHARTS_KIND: &str = "Charts";

pub const K3S_KIND: &str = "K3s";
pub const THICK_CHARTS_KIND: &str = "ThickCharts";
pub const IMAGE_TXTS_KIND: &str = "ImageTxts";

pub type Files = Document<FilesSpec>;
pub type Images = Document<ImagesSpec>;
pub type Charts = Document<ChartsSpec>;
pub type K3s = Document<K3sSpec>;
pub type ThickCharts = Document<ThickChartsSpec>;
pub type ImageTxts = Document<ImageTxtsSpec>;

// Content

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilesSpec {
    #[serde(default)]
    pub files: Vec<File>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Local path or HTTP(S) URL
    #[serde(rename = "ref")]
    pub reference: String,

    /// Stored file name, defaults to the last path segment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImagesSpec {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartsSpec {
    #[serde(default)]
    pub charts: Vec<Chart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub name: String,
    #[serde(rename = "repoURL")]
    pub repo_url: String,
    #[serde(default)]
    pub version: String,
}

// Collections

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct K3sSpec {
    /// Release version or channel name (`stable`, `latest`, ...)
    pub version: String,

    /// Target architecture, `amd64` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThickChartsSpec {
    #[serde(default)]
    pub charts: Vec<ThickChart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThickChart {
    pub name: String,

    #[serde(rename = "repoURL")]
    pub repo_url: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub values_config: ThickChartValuesConfig,

    /// Extra image paths in `{.a.b[*].c}` form
    #[serde(rename = "extraJSONPaths", default)]
    pub extra_json_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThickChartValuesConfig {
    /// Skip the render pass with the chart's own defaults
    #[serde(default)]
    pub disable_default: bool,

    #[serde(default)]
    pub overrides: Vec<ThickChartValueOverride>,
}

/// One override pass; `values` wins over `valuesFile` when both are set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThickChartValueOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Map<String, JsonValue>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_file: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageTxtsSpec {
    #[serde(default)]
    pub image_txts: Vec<ImageTxt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTxt {
    /// Local path or HTTP(S) URL of the list
    #[serde(rename = "ref")]
    pub reference: String,

    #[serde(default)]
    pub sources: ImageTxtSources,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageTxtSources {
    #[serde(default)]
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}
