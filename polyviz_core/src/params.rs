//! Viewer configuration
//!
//! A YAML document naming the fixed frame, the update rate and an ordered
//! list of displays with their property values. Property values are kept
//! as raw JSON values and applied through each display's property table.

use crate::error::VizResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

fn default_fixed_frame() -> String {
    "map".to_string()
}

fn default_update_rate() -> f64 {
    30.0
}

fn default_enabled() -> bool {
    true
}

/// One display entry of a viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayEntry {
    /// Registered display type, e.g. "PolygonalMap"
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Property name -> value, applied in name order
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl DisplayEntry {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            enabled: true,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Complete viewer layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_fixed_frame")]
    pub fixed_frame: String,
    /// Periodic update tick rate
    #[serde(default = "default_update_rate")]
    pub update_rate_hz: f64,
    #[serde(default)]
    pub displays: Vec<DisplayEntry>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            fixed_frame: default_fixed_frame(),
            update_rate_hz: default_update_rate(),
            displays: Vec::new(),
        }
    }
}

impl ViewerConfig {
    pub fn from_yaml_str(yaml: &str) -> VizResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn to_yaml_string(&self) -> VizResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Load from a YAML file
    pub fn load(path: impl AsRef<Path>) -> VizResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Save to a YAML file, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> VizResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_yaml_string()?)?;
        Ok(())
    }

    pub fn display(&self, name: &str) -> Option<&DisplayEntry> {
        self.displays.iter().find(|d| d.name == name)
    }
}
