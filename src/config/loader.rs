use crate::config::{decode_provisioner, ConfigError, Result};
use crate::types::{ConnectionConfig, ConnectionMethod, ProvisionerConfig};
use serde::Deserialize;
use std::path::Path;

/// On-disk provisioning file: a `connection` and a `provisioner` section.
#[derive(Debug, Clone)]
pub struct ProvisionFile {
    pub connection: ConnectionConfig,
    pub provisioner: ProvisionerConfig,
}

#[derive(Debug, Deserialize)]
struct RawProvisionFile {
    #[serde(default)]
    connection: ConnectionConfig,
    #[serde(default)]
    provisioner: serde_json::Value,
}

impl ProvisionFile {
    /// Loads a JSON file when the extension is `.json`, YAML otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let raw: RawProvisionFile = serde_yaml::from_str(content)?;
        raw.try_into()
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let raw: RawProvisionFile = serde_json::from_str(content)?;
        raw.try_into()
    }
}

impl TryFrom<RawProvisionFile> for ProvisionFile {
    type Error = ConfigError;

    fn try_from(raw: RawProvisionFile) -> Result<Self> {
        let provisioner = decode_provisioner(&raw.provisioner)?;
        validate_connection(&raw.connection)?;
        Ok(Self {
            connection: raw.connection,
            provisioner,
        })
    }
}

/// Rejects connection settings that no number of connection attempts could fix.
fn validate_connection(connection: &ConnectionConfig) -> Result<()> {
    if connection.method != ConnectionMethod::Ssh {
        return Ok(());
    }

    if connection.host.as_deref().map_or(true, |host| host.trim().is_empty()) {
        return Err(ConfigError::InvalidValue {
            field: "connection.host".to_string(),
            reason: "required for ssh connections".to_string(),
        });
    }

    if let Some(args) = &connection.ssh_args {
        shell_words::split(args).map_err(|e| ConfigError::InvalidValue {
            field: "connection.ssh_args".to_string(),
            reason: e.to_string(),
        })?;
    }

    Ok(())
}
