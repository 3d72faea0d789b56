use crate::provision::{Result, INVENTORY_FILE_PATH};
use crate::types::ProvisionerConfig;

/// Assembles the `ansible-playbook` invocation.
///
/// Flags appear in a fixed order: extra vars, skip tags, tags, vault password
/// file, start-at-task, limit, forks, verbose, force handlers, become.
pub fn build_command(
    config: &ProvisionerConfig,
    remote_playbook_path: &str,
    remote_vault_password_path: Option<&str>,
) -> Result<String> {
    let mut command =
        format!("ansible-playbook {remote_playbook_path} --inventory-file={INVENTORY_FILE_PATH}");

    if !config.extra_vars.is_empty() {
        let extra_vars = serde_json::to_string(&config.extra_vars)?;
        command.push_str(&format!(" --extra-vars='{extra_vars}'"));
    }
    if !config.skip_tags.is_empty() {
        command.push_str(&format!(" --skip-tags={}", config.skip_tags.join(",")));
    }
    if !config.tags.is_empty() {
        command.push_str(&format!(" --tags={}", config.tags.join(",")));
    }
    if let Some(path) = remote_vault_password_path.filter(|p| !p.is_empty()) {
        command.push_str(&format!(" --vault-password-file={path}"));
    }
    if let Some(task) = &config.start_at_task {
        command.push_str(&format!(" --start-at-task={task}"));
    }
    if let Some(limit) = &config.limit {
        command.push_str(&format!(" --limit={limit}"));
    }
    if config.forks > 0 {
        command.push_str(&format!(" --forks={}", config.forks));
    }
    if config.verbose {
        command.push_str(" --verbose");
    }
    if config.force_handlers {
        command.push_str(" --force-handlers");
    }
    if config.become_enabled {
        command.push_str(&format!(
            " --become --become-method='{}' --become-user='{}'",
            config.become_method, config.become_user
        ));
    }

    Ok(command)
}
