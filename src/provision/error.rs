use crate::communicator::TransportError;
use crate::config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Ansible module not found at path: [{path}]")]
    PathResolution { path: String },

    #[error("Could not connect to target host: {0}")]
    Connection(#[source] TransportError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Command {command:?} exited with non-zero exit status: {status}")]
    CommandFailed { command: String, status: i32 },

    #[error("Template rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Failed to encode extra vars: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Invalid '{name}' template: {reason}")]
    Template { name: String, reason: String },

    #[error("Error executing '{name}' template: {reason}")]
    Rendering { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
