use anyhow::{Context, Result};
use clap::Parser;
use rustle_provision::cli::{print_plan, ConsoleOutput, RustleProvisionCli};
use rustle_provision::communicator;
use rustle_provision::config::ProvisionFile;
use rustle_provision::provision::{Output, ProvisionWorkflow, TracingOutput};
use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = RustleProvisionCli::parse();

    // Initialize tracing
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    info!("Starting rustle-provision v{}", env!("CARGO_PKG_VERSION"));

    let file = ProvisionFile::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    if cli.dry_run {
        print_plan(&file.provisioner)?;
        return Ok(());
    }

    // plain log lines when piped into a file or CI log
    let output: Arc<dyn Output> = if std::io::stdout().is_terminal() {
        Arc::new(ConsoleOutput)
    } else {
        Arc::new(TracingOutput)
    };

    let communicator = communicator::from_config(&file.connection);
    let workflow = ProvisionWorkflow::new(&file.provisioner, communicator.as_ref(), output)?
        .with_retry_interval(Duration::from_secs(cli.retry_interval));

    if let Err(e) = workflow.run().await {
        error!("Provisioning failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
