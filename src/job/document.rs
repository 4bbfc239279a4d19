use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::error::{CidagError, Result};

/// The merged CI YAML: job names and global keywords mapped to their fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergedDocument(Mapping);

impl MergedDocument {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Field set of a job.
    ///
    /// # Errors
    ///
    /// Returns `UnknownJob` if the name is absent or does not map to a mapping.
    pub fn job(&self, name: &str) -> Result<&Mapping> {
        self.0
            .get(name)
            .and_then(Value::as_mapping)
            .ok_or_else(|| CidagError::UnknownJob(name.to_string()))
    }

    /// Top-level `variables`, empty when absent.
    pub fn global_variables(&self) -> Mapping {
        self.0
            .get("variables")
            .and_then(Value::as_mapping)
            .cloned()
            .unwrap_or_default()
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }
}
