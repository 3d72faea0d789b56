use crate::provision::{
    build_command, remote_join, ArtifactRenderer, Output, Phase, Result, BOOTSTRAP_DIRECTORY,
    INVENTORY_FILE_PATH, VAULT_DIRECTORY,
};
use crate::types::ProvisionerConfig;
use std::path::Path;

/// Prints observer lines to stdout
#[derive(Debug, Default)]
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn output(&self, line: &str) {
        println!("{line}");
    }

    fn phase(&self, phase: Phase) {
        match phase {
            Phase::Done => println!("✅ Provisioning complete"),
            Phase::Failed => println!("❌ Provisioning failed"),
            other => println!("▶ {other}"),
        }
    }
}

/// Renders what a run would upload and execute, without touching any host.
pub fn render_plan(config: &ProvisionerConfig) -> Result<String> {
    let renderer = ArtifactRenderer::new()?;
    let inventory = renderer.render_inventory(&config.hosts, &config.groups)?;

    let playbook_name = Path::new(&config.playbook)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.playbook.clone());
    let vault_path = config.vault_password_file.as_deref().map(|vault| {
        let name = Path::new(vault)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| vault.to_string());
        remote_join(VAULT_DIRECTORY, &name)
    });
    let command = build_command(
        config,
        &remote_join(BOOTSTRAP_DIRECTORY, &playbook_name),
        vault_path.as_deref(),
    )?;

    let mut plan = String::new();
    plan.push_str(&format!("📦 Inventory ({INVENTORY_FILE_PATH}):\n"));
    plan.push_str(&inventory);
    plan.push_str("🚀 Command:\n");
    if config.use_sudo {
        plan.push_str("sudo ");
    }
    plan.push_str(&command);
    plan.push('\n');
    Ok(plan)
}

/// Print the dry-run plan
pub fn print_plan(config: &ProvisionerConfig) -> Result<()> {
    print!("{}", render_plan(config)?);
    Ok(())
}
