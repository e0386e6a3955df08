//! Splitting content files into declarative documents

use airhaul_core::apis::{GroupVersionKind, TypeMeta};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::error::{Result, StoreError};

/// One document of a content file
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// File the document came from
    pub file: String,
    /// Position within the file, from 0
    pub index: usize,
    pub type_meta: TypeMeta,
    pub value: serde_yaml::Value,
}

impl RawDocument {
    pub fn gvk(&self) -> GroupVersionKind {
        self.type_meta.gvk()
    }

    /// Decode into a typed document
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_yaml::from_value(self.value.clone()).map_err(|e| self.invalid(e.to_string()))
    }

    fn invalid(&self, message: String) -> StoreError {
        StoreError::InvalidDocument {
            file: self.file.clone(),
            index: self.index,
            message,
        }
    }
}

/// Split a multi-document YAML stream; empty documents are dropped
pub fn parse_documents(file: &str, content: &str) -> Result<Vec<RawDocument>> {
    let mut documents = Vec::new();

    for (index, de) in serde_yaml::Deserializer::from_str(content).enumerate() {
        let invalid = |message: String| StoreError::InvalidDocument {
            file: file.to_string(),
            index,
            message,
        };

        let value = serde_yaml::Value::deserialize(de).map_err(|e| invalid(e.to_string()))?;
        if value.is_null() {
            continue;
        }

        let type_meta: TypeMeta =
            serde_yaml::from_value(value.clone()).map_err(|e| invalid(e.to_string()))?;
        if type_meta.api_version.is_empty() || type_meta.kind.is_empty() {
            return Err(invalid("apiVersion and kind are required".to_string()));
        }

        documents.push(RawDocument {
            file: file.to_string(),
            index,
            type_meta,
            value,
        });
    }

    Ok(documents)
}

/// Read and split a content file
pub fn read_documents(path: &Path) -> Result<Vec<RawDocument>> {
    let content = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_documents(&path.display().to_string(), &content)
}
