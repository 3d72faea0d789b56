use crate::communicator::process::spawn_with_outputs;
use crate::communicator::{
    CommandHandle, Communicator, Connection, RemoteCommand, Result, TransportError, UploadReader,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use walkdir::WalkDir;

/// Treats the invoking machine as the target host.
pub struct LocalCommunicator {
    timeout: Duration,
}

impl LocalCommunicator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Communicator for LocalCommunicator {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LocalConnection { closed: false }))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub struct LocalConnection {
    closed: bool,
}

impl LocalConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

fn upload_error(path: &str, e: impl std::fmt::Display) -> TransportError {
    TransportError::Upload {
        path: path.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl Connection for LocalConnection {
    async fn upload_file(&mut self, remote_path: &str, mut content: UploadReader) -> Result<()> {
        self.ensure_open()?;

        if let Some(parent) = Path::new(remote_path).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| upload_error(remote_path, e))?;
        }

        let mut file = tokio::fs::File::create(remote_path)
            .await
            .map_err(|e| upload_error(remote_path, e))?;
        tokio::io::copy(&mut content, &mut file)
            .await
            .map_err(|e| upload_error(remote_path, e))?;
        Ok(())
    }

    async fn upload_script(&mut self, remote_path: &str, content: UploadReader) -> Result<()> {
        self.upload_file(remote_path, content).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(remote_path, std::fs::Permissions::from_mode(0o777))
                .await
                .map_err(|e| upload_error(remote_path, e))?;
        }
        Ok(())
    }

    async fn upload_directory(&mut self, remote_root: &str, local_dir: &Path) -> Result<()> {
        self.ensure_open()?;

        let source = local_dir.to_path_buf();
        let target = PathBuf::from(remote_root);
        tokio::task::spawn_blocking(move || copy_tree(&source, &target))
            .await
            .map_err(|e| upload_error(remote_root, e))?
            .map_err(|e| upload_error(remote_root, e))
    }

    async fn start(&mut self, command: &mut RemoteCommand) -> Result<Box<dyn CommandHandle>> {
        self.ensure_open().map_err(|e| TransportError::Start {
            command: command.command.clone(),
            reason: e.to_string(),
        })?;

        debug!("Executing local command: {}", command.command);
        let mut process = Command::new("sh");
        process.arg("-c").arg(&command.command);
        spawn_with_outputs(process, command)
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

fn copy_tree(source: &Path, target: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(target)?;

    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry.map_err(std::io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(std::io::Error::other)?;
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            std::fs::copy(entry.path(), &destination)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_directory_copies_tree() {
        let source = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(source.path().join("roles/web")).unwrap();
        std::fs::write(source.path().join("playbook.yml"), "- hosts: all\n").unwrap();
        std::fs::write(source.path().join("roles/web/main.yml"), "---\n").unwrap();

        let target = tempfile::tempdir().unwrap();
        let root = target.path().join("bootstrap");

        let mut connection = LocalCommunicator::new(Duration::from_secs(1))
            .connect()
            .await
            .unwrap();
        connection
            .upload_directory(root.to_str().unwrap(), source.path())
            .await
            .unwrap();

        assert!(root.join("playbook.yml").is_file());
        assert!(root.join("roles/web/main.yml").is_file());
    }

    #[tokio::test]
    async fn test_closed_connection_rejects_uploads() {
        let mut connection = LocalCommunicator::new(Duration::from_secs(1))
            .connect()
            .await
            .unwrap();
        connection.disconnect().await.unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("file");
        let result = connection
            .upload_file(path.to_str().unwrap(), Box::new(&b"data"[..]))
            .await;
        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
