use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Provisioner configuration must be an object, got {found}")]
    NotAnObject { found: &'static str },

    #[error("Unknown provisioner setting: {field}")]
    UnknownField { field: String },

    #[error("Unsupported type for {field}: expected {expected}, got {found}")]
    UnsupportedType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML format: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON format: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
