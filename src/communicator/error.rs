use thiserror::Error;

/// Failures reported by a transport implementation
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection to {host} failed: {reason}")]
    Connect { host: String, reason: String },

    #[error("Upload to {path} failed: {reason}")]
    Upload { path: String, reason: String },

    #[error("Error executing command {command:?}: {reason}")]
    Start { command: String, reason: String },

    #[error("Waiting for remote command failed: {reason}")]
    Wait { reason: String },

    #[error("Connection is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
