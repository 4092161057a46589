//! Error types for the polyviz runtime

use thiserror::Error;

/// Errors raised by displays, the topic bus, the scene host and configuration loading
#[derive(Debug, Error)]
pub enum VizError {
    #[error("Scene error: {0}")]
    Scene(String),

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Property '{property}' expects a {expected} value, got {found}")]
    PropertyType {
        property: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Property '{property}' has no option '{value}'")]
    InvalidOption { property: String, value: String },

    #[error("Topic '{topic}' carries {bound}, not {requested}")]
    TopicTypeMismatch {
        topic: String,
        bound: &'static str,
        requested: &'static str,
    },

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Malformed message: {0}")]
    Geometry(String),

    #[error("Unknown display type '{0}'")]
    UnknownDisplayType(String),

    #[error("Display '{0}' not found")]
    DisplayNotFound(String),

    #[error("Display '{0}' already exists")]
    DuplicateDisplay(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for polyviz operations
pub type VizResult<T> = Result<T, VizError>;
