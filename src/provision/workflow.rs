use crate::communicator::{Communicator, Connection};
use crate::paths::resolve_existing;
use crate::provision::{
    build_command, establish, installer_package, remote_join, remote_parent, ArtifactRenderer,
    Output, Phase, ProvisionError, RemoteExecutor, Result, BOOTSTRAP_DIRECTORY,
    DEFAULT_RETRY_INTERVAL, INSTALLER_PATH, INVENTORY_FILE_PATH, VAULT_DIRECTORY,
};
use crate::types::ProvisionerConfig;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument};

/// Runs one provisioning invocation with the default retry interval.
pub async fn run_provision(
    config: &ProvisionerConfig,
    communicator: &dyn Communicator,
    output: Arc<dyn Output>,
) -> Result<()> {
    ProvisionWorkflow::new(config, communicator, output)?
        .run()
        .await
}

/// Sequences connect, install, upload, run and cleanup for one target host.
///
/// Steps run one after another on the calling task. Once a connection is
/// open it is disconnected exactly once, whatever the outcome.
pub struct ProvisionWorkflow<'a> {
    config: &'a ProvisionerConfig,
    communicator: &'a dyn Communicator,
    output: Arc<dyn Output>,
    executor: RemoteExecutor,
    renderer: ArtifactRenderer,
    retry_interval: Duration,
}

/// Remote locations produced by the upload phase
struct UploadedArtifacts {
    playbook_path: String,
    vault_password_path: Option<String>,
}

impl<'a> ProvisionWorkflow<'a> {
    pub fn new(
        config: &'a ProvisionerConfig,
        communicator: &'a dyn Communicator,
        output: Arc<dyn Output>,
    ) -> Result<Self> {
        Ok(Self {
            config,
            communicator,
            executor: RemoteExecutor::new(output.clone()),
            output,
            renderer: ArtifactRenderer::new()?,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        })
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub async fn run(&self) -> Result<()> {
        let span = info_span!("provision", id = %uuid::Uuid::new_v4());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<()> {
        self.enter(Phase::Connecting);
        let mut connection = match establish(
            self.communicator.timeout(),
            self.retry_interval,
            || self.communicator.connect(),
        )
        .await
        {
            Ok(connection) => connection,
            Err(e) => return Err(self.fail(ProvisionError::Connection(e))),
        };
        info!("Connected to target host");

        let result = self.provision(connection.as_mut()).await;
        let result = match result {
            Ok(()) => {
                self.enter(Phase::Done);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        };

        if let Err(e) = connection.disconnect().await {
            warn!("Disconnect failed: {}", e);
        }
        result
    }

    async fn provision(&self, connection: &mut dyn Connection) -> Result<()> {
        if !self.config.skip_install {
            self.enter(Phase::Installing);
            self.install_ansible(connection).await?;
        }

        self.enter(Phase::UploadingArtifacts);
        let artifacts = self.upload_artifacts(connection).await?;

        self.enter(Phase::BuildingCommand);
        let command = build_command(
            self.config,
            &artifacts.playbook_path,
            artifacts.vault_password_path.as_deref(),
        )?;

        self.enter(Phase::Running);
        self.output.output(&format!("running command: {command}"));
        self.run_command(connection, &command).await?;

        if !self.config.skip_cleanup {
            self.enter(Phase::CleaningUp);
            self.cleanup(connection).await;
        }

        Ok(())
    }

    async fn install_ansible(&self, connection: &mut dyn Connection) -> Result<()> {
        let version = self.config.install_version.as_deref().unwrap_or_default();
        self.output.output(&format!(
            "Installing '{}'...",
            installer_package(version)
        ));

        let script = self.renderer.render_installer(version)?;

        self.output.output(&format!(
            "Uploading ansible installer program to {INSTALLER_PATH}..."
        ));
        connection
            .upload_script(
                INSTALLER_PATH,
                Box::new(std::io::Cursor::new(script.into_bytes())),
            )
            .await?;

        let command = format!("/bin/bash -c '{INSTALLER_PATH} && rm {INSTALLER_PATH}'");
        self.run_command(connection, &command).await?;

        self.output.output("Ansible installed.");
        Ok(())
    }

    async fn upload_artifacts(
        &self,
        connection: &mut dyn Connection,
    ) -> Result<UploadedArtifacts> {
        let playbook = resolve_existing(&self.config.playbook).ok_or_else(|| {
            ProvisionError::PathResolution {
                path: self.config.playbook.clone(),
            }
        })?;

        // the playbook sits at the top of its module; ship the whole directory
        let playbook_dir = playbook
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let playbook_name = file_name(&playbook, &self.config.playbook)?;
        connection
            .upload_directory(BOOTSTRAP_DIRECTORY, playbook_dir)
            .await?;
        let playbook_path = remote_join(BOOTSTRAP_DIRECTORY, &playbook_name);

        let vault_password_path = match self.config.vault_password_file.as_deref() {
            Some(vault_file) => {
                Some(self.upload_vault_password_file(connection, vault_file).await?)
            }
            None => None,
        };

        self.upload_inventory(connection).await?;

        Ok(UploadedArtifacts {
            playbook_path,
            vault_password_path,
        })
    }

    async fn upload_vault_password_file(
        &self,
        connection: &mut dyn Connection,
        vault_file: &str,
    ) -> Result<String> {
        let local_path =
            resolve_existing(vault_file).ok_or_else(|| ProvisionError::PathResolution {
                path: vault_file.to_string(),
            })?;
        let target_path = remote_join(VAULT_DIRECTORY, &file_name(&local_path, vault_file)?);

        self.prepare_directory(connection, VAULT_DIRECTORY).await;

        self.output.output(&format!(
            "Uploading ansible vault password file to '{target_path}'..."
        ));
        let file = tokio::fs::File::open(&local_path).await?;
        connection
            .upload_file(&target_path, Box::new(tokio::io::BufReader::new(file)))
            .await?;
        self.output.output("Ansible vault password file uploaded.");

        Ok(target_path)
    }

    async fn upload_inventory(&self, connection: &mut dyn Connection) -> Result<()> {
        self.output.output("Generating ansible inventory...");
        let inventory = self
            .renderer
            .render_inventory(&self.config.hosts, &self.config.groups)?;

        self.prepare_directory(connection, remote_parent(INVENTORY_FILE_PATH))
            .await;

        self.output.output(&format!(
            "Uploading ansible inventory to {INVENTORY_FILE_PATH}..."
        ));
        connection
            .upload_file(
                INVENTORY_FILE_PATH,
                Box::new(std::io::Cursor::new(inventory.into_bytes())),
            )
            .await?;
        self.output.output("Ansible inventory uploaded.");
        Ok(())
    }

    /// Creates a world-writable directory; failures only get logged since
    /// the following upload reports the real problem.
    async fn prepare_directory(&self, connection: &mut dyn Connection, directory: &str) {
        for command in [
            format!("mkdir -p {directory}"),
            format!("chmod 0777 {directory}"),
        ] {
            if let Err(e) = self.run_command(connection, &command).await {
                warn!("Preparing {} failed: {}", directory, e);
            }
        }
    }

    /// Best effort; never changes the outcome of the run.
    async fn cleanup(&self, connection: &mut dyn Connection) {
        self.output.output("Cleaning up after bootstrap...");
        let command = format!("rm -rf {BOOTSTRAP_DIRECTORY}");
        if let Err(e) = self.run_command(connection, &command).await {
            warn!("Cleanup failed: {}", e);
        }
        self.output.output("Cleanup complete.");
    }

    /// Every command of the run goes through here so the sudo prefix is
    /// applied uniformly.
    async fn run_command(&self, connection: &mut dyn Connection, command: &str) -> Result<()> {
        let command = if self.config.use_sudo {
            format!("sudo {command}")
        } else {
            command.to_string()
        };
        self.executor.run(connection, &command).await
    }

    fn enter(&self, phase: Phase) {
        info!("Entering phase: {}", phase);
        self.output.phase(phase);
    }

    fn fail(&self, error: ProvisionError) -> ProvisionError {
        self.output.output(&error.to_string());
        self.enter(Phase::Failed);
        error
    }
}

fn file_name(path: &Path, configured: &str) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ProvisionError::PathResolution {
            path: configured.to_string(),
        })
}
