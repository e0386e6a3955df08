//! Declarative content and collection documents
//!
//! Every document is a kinded envelope:
//!
//! ```yaml
//! apiVersion: content.airhaul.io/v1alpha1
//! kind: Images
//! metadata:
//!   name: base
//! spec:
//!   images:
//!     - ref: nginx:1.25
//! ```
//!
//! Two groups exist, `content.airhaul.io` for single artifacts and
//! `collection.airhaul.io` for collections, each at `v1alpha1` and
//! `v1alpha2`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod v1alpha1;

/// Domain shared by every group
pub const API_DOMAIN: &str = "airhaul.io";

/// Group for single-artifact kinds
pub const CONTENT_GROUP: &str = "content.airhaul.io";

/// Group for collection kinds
pub const COLLECTION_GROUP: &str = "collection.airhaul.io";

pub const V1ALPHA1: &str = "v1alpha1";
pub const V1ALPHA2: &str = "v1alpha2";

/// API group and version, as written in `apiVersion`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersion {
    pub group: String,
    pub version: String,
}

impl GroupVersion {
    pub fn new(group: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
        }
    }

    /// Split an `apiVersion` string; a bare version belongs to the core group
    pub fn parse(api_version: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version),
            None => Self::new("", api_version),
        }
    }

    pub fn content(version: &str) -> Self {
        Self::new(CONTENT_GROUP, version)
    }

    pub fn collection(version: &str) -> Self {
        Self::new(COLLECTION_GROUP, version)
    }

    pub fn with_kind(&self, kind: impl Into<String>) -> GroupVersionKind {
        GroupVersionKind {
            group_version: self.clone(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for GroupVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.version)
        } else {
            write!(f, "{}/{}", self.group, self.version)
        }
    }
}

/// Fully qualified document type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupVersionKind {
    pub group_version: GroupVersion,
    pub kind: String,
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.group_version, self.kind)
    }
}

/// The `apiVersion` and `kind` of a document, read before its spec
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}

impl TypeMeta {
    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersion::parse(&self.api_version).with_kind(self.kind.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A typed document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<S> {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: S,
}

impl<S> Document<S> {
    /// `metadata.name`, or an empty string
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersion::parse(&self.api_version).with_kind(self.kind.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_version_parse() {
        let gv = GroupVersion::parse("content.airhaul.io/v1alpha1");
        assert_eq!(gv, GroupVersion::content(V1ALPHA1));
        assert_eq!(gv.to_string(), "content.airhaul.io/v1alpha1");

        let core = GroupVersion::parse("v1");
        assert_eq!(core.group, "");
        assert_eq!(core.to_string(), "v1");
    }

    #[test]
    fn test_gvk_display() {
        let gvk = GroupVersion::collection(V1ALPHA2).with_kind("K3s");
        assert_eq!(gvk.to_string(), "collection.airhaul.io/v1alpha2, Kind=K3s");
    }

    #[test]
    fn test_type_meta_ignores_spec() {
        let meta: TypeMeta = serde_yaml::from_str(
            "apiVersion: content.airhaul.io/v1alpha1\nkind: Bogus\nspec:\n  anything: [1, 2]\n",
        )
        .unwrap();
        assert_eq!(meta.gvk().kind, "Bogus");
        assert_eq!(meta.gvk().group_version, GroupVersion::content(V1ALPHA1));
    }
}
