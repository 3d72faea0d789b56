//! Typed decoding of the generic provisioner settings object.

use crate::config::{ConfigError, Result};
use crate::types::{dedup_ordered, normalize_hosts, ProvisionerConfig};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const KNOWN_FIELDS: &[&str] = &[
    "playbook",
    "hosts",
    "groups",
    "tags",
    "skip_tags",
    "start_at_task",
    "limit",
    "forks",
    "extra_vars",
    "verbose",
    "force_handlers",
    "become",
    "become_method",
    "become_user",
    "vault_password_file",
    "use_sudo",
    "skip_install",
    "skip_cleanup",
    "install_version",
];

/// Decodes a key-value settings object into a [`ProvisionerConfig`].
///
/// Missing keys and `null` values take the defaults of
/// [`ProvisionerConfig::default`]. `Value::Null` as a whole decodes to the
/// defaults.
pub fn decode_provisioner(value: &Value) -> Result<ProvisionerConfig> {
    let empty = Map::new();
    let settings = match value {
        Value::Object(map) => map,
        Value::Null => &empty,
        other => {
            return Err(ConfigError::NotAnObject {
                found: type_name(other),
            })
        }
    };

    if let Some(field) = settings
        .keys()
        .find(|k| !KNOWN_FIELDS.contains(&k.as_str()))
    {
        return Err(ConfigError::UnknownField {
            field: field.clone(),
        });
    }

    let defaults = ProvisionerConfig::default();
    let decoder = Decoder { settings };

    Ok(ProvisionerConfig {
        playbook: decoder.string("playbook")?.unwrap_or(defaults.playbook),
        hosts: normalize_hosts(decoder.string_list("hosts")?),
        groups: decoder.string_list("groups")?,
        tags: dedup_ordered(decoder.string_list("tags")?),
        skip_tags: dedup_ordered(decoder.string_list("skip_tags")?),
        start_at_task: decoder.string("start_at_task")?,
        limit: decoder.string("limit")?,
        forks: decoder.forks("forks")?,
        extra_vars: decoder.map("extra_vars")?,
        verbose: decoder.bool("verbose")?.unwrap_or(defaults.verbose),
        force_handlers: decoder
            .bool("force_handlers")?
            .unwrap_or(defaults.force_handlers),
        become_enabled: decoder.bool("become")?.unwrap_or(defaults.become_enabled),
        become_method: decoder
            .string("become_method")?
            .unwrap_or(defaults.become_method),
        become_user: decoder
            .string("become_user")?
            .unwrap_or(defaults.become_user),
        vault_password_file: decoder.string("vault_password_file")?,
        use_sudo: decoder.bool("use_sudo")?.unwrap_or(defaults.use_sudo),
        skip_install: decoder.bool("skip_install")?.unwrap_or(defaults.skip_install),
        skip_cleanup: decoder.bool("skip_cleanup")?.unwrap_or(defaults.skip_cleanup),
        install_version: decoder.string("install_version")?,
    })
}

struct Decoder<'a> {
    settings: &'a Map<String, Value>,
}

impl Decoder<'_> {
    fn get(&self, field: &str) -> Option<&Value> {
        self.settings.get(field).filter(|v| !v.is_null())
    }

    /// Empty strings count as unset.
    fn string(&self, field: &str) -> Result<Option<String>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(unsupported(field, "string", other)),
        }
    }

    fn bool(&self, field: &str) -> Result<Option<bool>> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(unsupported(field, "bool", other)),
        }
    }

    fn string_list(&self, field: &str) -> Result<Vec<String>> {
        let items = match self.get(field) {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(other) => return Err(unsupported(field, "list of strings", other)),
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(unsupported(&format!("{field}[{index}]"), "string", other)),
            })
            .collect()
    }

    fn map(&self, field: &str) -> Result<BTreeMap<String, Value>> {
        match self.get(field) {
            None => Ok(BTreeMap::new()),
            Some(Value::Object(map)) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Some(other) => Err(unsupported(field, "map", other)),
        }
    }

    fn forks(&self, field: &str) -> Result<u32> {
        let value = match self.get(field) {
            None => return Ok(0),
            Some(value) => value,
        };

        let number = value
            .as_i64()
            .ok_or_else(|| unsupported(field, "integer", value))?;

        u32::try_from(number).map_err(|_| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("{number} is not a non-negative 32-bit integer"),
        })
    }
}

fn unsupported(field: &str, expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::UnsupportedType {
        field: field.to_string(),
        expected,
        found: type_name(found),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
