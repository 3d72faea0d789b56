#![allow(dead_code)]

use async_trait::async_trait;
use rustle_provision::communicator::{
    CommandHandle, Communicator, Connection, RemoteCommand, Result, TransportError, UploadReader,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::task::JoinHandle;

/// What a scripted command writes and how it exits
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    pub stdout: String,
    pub stderr: String,
    pub status: i32,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub connect_attempts: usize,
    pub disconnects: usize,
    pub uploads: Vec<(String, Vec<u8>)>,
    pub scripts: Vec<(String, Vec<u8>)>,
    pub directories: Vec<(String, PathBuf)>,
    pub commands: Vec<String>,
}

/// In-memory transport that records every interaction.
#[derive(Clone)]
pub struct MockCommunicator {
    pub state: Arc<Mutex<MockState>>,
    failing_connects: usize,
    timeout: Duration,
    runs: Vec<(String, ScriptedRun)>,
    failing_upload: Option<String>,
    failing_start: Option<String>,
}

impl MockCommunicator {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failing_connects: 0,
            timeout: Duration::from_secs(30),
            runs: Vec::new(),
            failing_upload: None,
            failing_start: None,
        }
    }

    /// The first `count` connection attempts fail.
    pub fn failing_connects(mut self, count: usize) -> Self {
        self.failing_connects = count;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Commands containing `pattern` produce `run`; everything else exits 0
    /// silently.
    pub fn on_command(mut self, pattern: &str, run: ScriptedRun) -> Self {
        self.runs.push((pattern.to_string(), run));
        self
    }

    pub fn failing_upload(mut self, path: &str) -> Self {
        self.failing_upload = Some(path.to_string());
        self
    }

    pub fn failing_start(mut self, pattern: &str) -> Self {
        self.failing_start = Some(pattern.to_string());
        self
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().unwrap().disconnects
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().unwrap().connect_attempts
    }

    pub fn upload(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .uploads
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, data)| String::from_utf8_lossy(data).into_owned())
    }
}

#[async_trait]
impl Communicator for MockCommunicator {
    async fn connect(&self) -> Result<Box<dyn Connection>> {
        let attempt = {
            let mut state = self.state.lock().unwrap();
            state.connect_attempts += 1;
            state.connect_attempts
        };

        if attempt <= self.failing_connects {
            return Err(TransportError::Connect {
                host: "mock".to_string(),
                reason: format!("connection refused (attempt {attempt})"),
            });
        }

        Ok(Box::new(MockConnection {
            communicator: self.clone(),
        }))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

pub struct MockConnection {
    communicator: MockCommunicator,
}

impl MockConnection {
    fn check_upload(&self, path: &str) -> Result<()> {
        match &self.communicator.failing_upload {
            Some(failing) if failing == path => Err(TransportError::Upload {
                path: path.to_string(),
                reason: "permission denied".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn upload_file(&mut self, remote_path: &str, mut content: UploadReader) -> Result<()> {
        self.check_upload(remote_path)?;
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;
        self.communicator
            .state
            .lock()
            .unwrap()
            .uploads
            .push((remote_path.to_string(), data));
        Ok(())
    }

    async fn upload_script(&mut self, remote_path: &str, mut content: UploadReader) -> Result<()> {
        self.check_upload(remote_path)?;
        let mut data = Vec::new();
        content.read_to_end(&mut data).await?;
        self.communicator
            .state
            .lock()
            .unwrap()
            .scripts
            .push((remote_path.to_string(), data));
        Ok(())
    }

    async fn upload_directory(&mut self, remote_root: &str, local_dir: &Path) -> Result<()> {
        self.check_upload(remote_root)?;
        self.communicator
            .state
            .lock()
            .unwrap()
            .directories
            .push((remote_root.to_string(), local_dir.to_path_buf()));
        Ok(())
    }

    async fn start(&mut self, command: &mut RemoteCommand) -> Result<Box<dyn CommandHandle>> {
        self.communicator
            .state
            .lock()
            .unwrap()
            .commands
            .push(command.command.clone());

        if let Some(pattern) = &self.communicator.failing_start {
            if command.command.contains(pattern.as_str()) {
                return Err(TransportError::Start {
                    command: command.command.clone(),
                    reason: "session closed".to_string(),
                });
            }
        }

        let run = self
            .communicator
            .runs
            .iter()
            .find(|(pattern, _)| command.command.contains(pattern.as_str()))
            .map(|(_, run)| run.clone())
            .unwrap_or_default();

        let stdout = command.take_stdout();
        let stderr = command.take_stderr();
        let writes = tokio::spawn(async move {
            if let Some(mut out) = stdout {
                let _ = out.write_all(run.stdout.as_bytes()).await;
            }
            if let Some(mut err) = stderr {
                let _ = err.write_all(run.stderr.as_bytes()).await;
            }
        });

        Ok(Box::new(MockHandle {
            status: run.status,
            writes,
        }))
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.communicator.state.lock().unwrap().disconnects += 1;
        Ok(())
    }
}

struct MockHandle {
    status: i32,
    writes: JoinHandle<()>,
}

#[async_trait]
impl CommandHandle for MockHandle {
    async fn wait(self: Box<Self>) -> Result<i32> {
        let MockHandle { status, writes } = *self;
        let _ = writes.await;
        Ok(status)
    }
}

/// Writes a playbook into a fresh temporary module directory.
pub fn playbook_dir() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let playbook = dir.path().join("playbook.yml");
    std::fs::write(&playbook, "- hosts: all\n  tasks: []\n").unwrap();
    let path = playbook.to_str().unwrap().to_string();
    (dir, path)
}
