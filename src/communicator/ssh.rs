use crate::communicator::process::spawn_with_outputs;
use crate::communicator::{
    CommandHandle, Communicator, Connection, RemoteCommand, Result, TransportError, UploadReader,
};
use crate::paths::expand_home;
use crate::types::ConnectionConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

/// Communicator backed by the system `ssh` and `scp` binaries.
///
/// `connect` starts a control master so that every later command and upload
/// reuses one authenticated session; `disconnect` tells the master to exit.
pub struct SshCommunicator {
    config: ConnectionConfig,
}

impl SshCommunicator {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    fn destination(&self) -> Result<String> {
        self.config
            .destination()
            .ok_or_else(|| TransportError::Connect {
                host: "<unset>".to_string(),
                reason: "no host configured for ssh connection".to_string(),
            })
    }
}

/// Options shared by every `ssh` and `scp` invocation of one connection.
fn ssh_options(config: &ConnectionConfig, control_path: &Path) -> Result<Vec<String>> {
    let mut options = vec![
        "-o".to_string(),
        "StrictHostKeyChecking=no".to_string(),
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
    ];

    if let Some(key) = &config.private_key_file {
        options.push("-i".to_string());
        options.push(expand_home(key).display().to_string());
    }

    if let Some(extra) = &config.ssh_args {
        let extra = shell_words::split(extra).map_err(|e| TransportError::Connect {
            host: config.host.clone().unwrap_or_default(),
            reason: format!("invalid ssh_args: {e}"),
        })?;
        options.extend(extra);
    }

    Ok(options)
}

fn chmod_command(remote_path: &str) -> String {
    format!("chmod 0777 {}", shell_words::quote(remote_path))
}

/// Remote side of a directory upload: unpacks a tar stream read from stdin.
fn extract_command(remote_root: &str) -> String {
    let root = shell_words::quote(remote_root);
    format!("mkdir -p {root} && tar -xf - -C {root}")
}

#[async_trait]
impl Communicator for SshCommunicator {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let destination = self.destination()?;
        let control_path =
            std::env::temp_dir().join(format!("rustle-provision-{}.sock", uuid::Uuid::new_v4()));
        let options = ssh_options(&self.config, &control_path)?;
        let port = self.config.port().to_string();

        info!("Connecting to {} over ssh", destination);

        let output = Command::new("ssh")
            .args(&options)
            .args(["-p", port.as_str()])
            .args(["-o", "ControlMaster=yes", "-o", "ControlPersist=yes"])
            .args(["-o", "ConnectTimeout=10"])
            .args(["-f", "-N"])
            .arg(&destination)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TransportError::Connect {
                host: destination.clone(),
                reason: format!("failed to run ssh: {e}"),
            })?;

        if !output.status.success() {
            return Err(TransportError::Connect {
                host: destination,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Box::new(SshConnection {
            destination,
            options,
            port,
            control_path,
            closed: false,
        }))
    }

    fn timeout(&self) -> Duration {
        self.config.connect_timeout()
    }
}

pub struct SshConnection {
    destination: String,
    options: Vec<String>,
    port: String,
    control_path: PathBuf,
    closed: bool,
}

impl SshConnection {
    fn ssh(&self) -> Result<Command> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let mut cmd = Command::new("ssh");
        cmd.args(&self.options)
            .args(["-p", self.port.as_str()])
            .arg(&self.destination);
        Ok(cmd)
    }

    async fn run(&self, remote_command: &str, stdin: Option<Vec<u8>>) -> Result<Output> {
        debug!("Executing command on {}: {}", self.destination, remote_command);

        let mut cmd = self.ssh()?;
        cmd.arg(remote_command)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(&data).await?;
            pipe.shutdown().await?;
        }

        Ok(child.wait_with_output().await?)
    }

    async fn run_checked(
        &self,
        remote_command: &str,
        path: &str,
        stdin: Option<Vec<u8>>,
    ) -> Result<()> {
        let output = self.run(remote_command, stdin).await?;
        if !output.status.success() {
            return Err(TransportError::Upload {
                path: path.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for SshConnection {
    async fn upload_file(&mut self, remote_path: &str, mut content: UploadReader) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;

        let temp_file = tempfile::NamedTempFile::new()?;
        tokio::fs::write(temp_file.path(), &data).await?;

        let output = Command::new("scp")
            .args(&self.options)
            .args(["-P", self.port.as_str()])
            .arg(temp_file.path())
            .arg(format!("{}:{}", self.destination, remote_path))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TransportError::Upload {
                path: remote_path.to_string(),
                reason: format!("failed to run scp: {e}"),
            })?;

        if !output.status.success() {
            return Err(TransportError::Upload {
                path: remote_path.to_string(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    async fn upload_script(&mut self, remote_path: &str, content: UploadReader) -> Result<()> {
        self.upload_file(remote_path, content).await?;
        self.run_checked(&chmod_command(remote_path), remote_path, None)
            .await
    }

    async fn upload_directory(&mut self, remote_root: &str, local_dir: &Path) -> Result<()> {
        let local_dir = local_dir.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || -> std::io::Result<Vec<u8>> {
            let mut builder = tar::Builder::new(Vec::new());
            builder.follow_symlinks(true);
            builder.append_dir_all(".", &local_dir)?;
            builder.into_inner()
        })
        .await
        .map_err(|e| TransportError::Upload {
            path: remote_root.to_string(),
            reason: format!("archive task failed: {e}"),
        })??;

        self.run_checked(&extract_command(remote_root), remote_root, Some(archive))
            .await
    }

    async fn start(&mut self, command: &mut RemoteCommand) -> Result<Box<dyn CommandHandle>> {
        let mut cmd = self.ssh().map_err(|e| TransportError::Start {
            command: command.command.clone(),
            reason: e.to_string(),
        })?;
        cmd.arg(&command.command);
        spawn_with_outputs(cmd, command)
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let output = Command::new("ssh")
            .args(&self.options)
            .args(["-O", "exit"])
            .arg(&self.destination)
            .stdin(Stdio::null())
            .output()
            .await?;

        let _ = tokio::fs::remove_file(&self.control_path).await;

        if !output.status.success() {
            debug!(
                "Control master for {} did not exit cleanly: {}",
                self.destination,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
