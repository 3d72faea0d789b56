use std::collections::BTreeMap;

/// Host that is always present in the generated inventory
pub const LOCALHOST: &str = "localhost";

pub const DEFAULT_PLAYBOOK: &str = "~/ansible/playbook.yaml";
pub const DEFAULT_BECOME_METHOD: &str = "sudo";
pub const DEFAULT_BECOME_USER: &str = "user";

/// Per-invocation provisioner settings.
///
/// Built once by [`crate::config::decode_provisioner`] and read-only afterwards.
/// `hosts` always ends with a single [`LOCALHOST`] entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionerConfig {
    pub playbook: String,
    pub hosts: Vec<String>,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
    pub skip_tags: Vec<String>,
    pub start_at_task: Option<String>,
    pub limit: Option<String>,
    /// Zero leaves `--forks` off the command line
    pub forks: u32,
    pub extra_vars: BTreeMap<String, serde_json::Value>,
    pub verbose: bool,
    pub force_handlers: bool,

    pub become_enabled: bool,
    pub become_method: String,
    pub become_user: String,

    pub vault_password_file: Option<String>,

    pub use_sudo: bool,
    pub skip_install: bool,
    pub skip_cleanup: bool,
    pub install_version: Option<String>,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            playbook: DEFAULT_PLAYBOOK.to_string(),
            hosts: vec![LOCALHOST.to_string()],
            groups: Vec::new(),
            tags: Vec::new(),
            skip_tags: Vec::new(),
            start_at_task: None,
            limit: None,
            forks: 0,
            extra_vars: BTreeMap::new(),
            verbose: false,
            force_handlers: false,
            become_enabled: false,
            become_method: DEFAULT_BECOME_METHOD.to_string(),
            become_user: DEFAULT_BECOME_USER.to_string(),
            vault_password_file: None,
            use_sudo: true,
            skip_install: false,
            skip_cleanup: false,
            install_version: None,
        }
    }
}

impl ProvisionerConfig {
    /// Replaces the configured hosts, keeping the trailing localhost entry.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = normalize_hosts(hosts.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }
}

/// Drops user supplied localhost entries and appends exactly one at the end.
pub fn normalize_hosts(hosts: Vec<String>) -> Vec<String> {
    let mut hosts: Vec<String> = hosts.into_iter().filter(|h| h != LOCALHOST).collect();
    hosts.push(LOCALHOST.to_string());
    hosts
}

/// Removes duplicates while keeping first occurrence order.
pub fn dedup_ordered(values: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .filter(|v| seen.insert(v.clone()))
        .collect()
}
