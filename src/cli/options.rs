use clap::Parser;
use std::path::PathBuf;

/// Bootstrap Ansible on a host and run a playbook there
#[derive(Parser, Debug)]
#[command(name = "rustle-provision")]
#[command(about = "Bootstrap Ansible on a remote host and run a playbook against it")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct RustleProvisionCli {
    /// Provisioning file with `connection` and `provisioner` sections (YAML or JSON)
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the inventory and command that would run without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Seconds to wait between connection attempts
    #[arg(long, default_value = "3")]
    pub retry_interval: u64,
}
