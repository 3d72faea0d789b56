//! Transport seam between the provisioning workflow and the target host.
//!
//! The workflow only talks to the traits in this module. [`SshCommunicator`]
//! and [`LocalCommunicator`] are the shipped implementations.

pub mod error;
pub mod local;
mod process;
pub mod ssh;

pub use error::*;
pub use local::LocalCommunicator;
pub use ssh::SshCommunicator;

use crate::types::{ConnectionConfig, ConnectionMethod};
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

pub type OutputWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

/// Opens connections to one target host.
#[async_trait]
pub trait Communicator: Send + Sync {
    /// Single connection attempt. Retrying is the caller's business.
    async fn connect(&self) -> Result<Box<dyn Connection>>;

    /// Overall budget for establishing a connection
    fn timeout(&self) -> Duration;
}

/// A live connection, used sequentially by one workflow.
#[async_trait]
pub trait Connection: Send {
    async fn upload_file(&mut self, remote_path: &str, content: UploadReader) -> Result<()>;

    /// Like [`Connection::upload_file`] but the result is executable.
    async fn upload_script(&mut self, remote_path: &str, content: UploadReader) -> Result<()>;

    /// Copies the contents of `local_dir` into `remote_root`.
    async fn upload_directory(&mut self, remote_root: &str, local_dir: &Path) -> Result<()>;

    /// Submits the command. Implementations take the output writers out of
    /// `command` and must have dropped them by the time
    /// [`CommandHandle::wait`] returns.
    async fn start(&mut self, command: &mut RemoteCommand) -> Result<Box<dyn CommandHandle>>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// A command that was submitted and is running on the remote side.
#[async_trait]
pub trait CommandHandle: Send {
    /// Blocks until the remote process ends and returns its exit status.
    async fn wait(self: Box<Self>) -> Result<i32>;
}

/// One command execution: the command line, the two output writers and the
/// recorded exit status.
pub struct RemoteCommand {
    pub command: String,
    stdout: Option<OutputWriter>,
    stderr: Option<OutputWriter>,
    exit_status: Option<i32>,
}

impl RemoteCommand {
    pub fn new(command: impl Into<String>, stdout: OutputWriter, stderr: OutputWriter) -> Self {
        Self {
            command: command.into(),
            stdout: Some(stdout),
            stderr: Some(stderr),
            exit_status: None,
        }
    }

    pub fn take_stdout(&mut self) -> Option<OutputWriter> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<OutputWriter> {
        self.stderr.take()
    }

    /// Drops whichever writers the transport left behind.
    pub fn close_outputs(&mut self) {
        self.stdout = None;
        self.stderr = None;
    }

    pub fn set_exit_status(&mut self, status: i32) {
        self.exit_status = Some(status);
    }
}

impl std::fmt::Debug for RemoteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCommand")
            .field("command", &self.command)
            .field("exit_status", &self.exit_status)
            .finish()
    }
}

/// Builds the communicator described by a connection section.
pub fn from_config(config: &ConnectionConfig) -> Box<dyn Communicator> {
    match config.method {
        ConnectionMethod::Ssh => Box::new(SshCommunicator::new(config.clone())),
        ConnectionMethod::Local => Box::new(LocalCommunicator::new(config.connect_timeout())),
    }
}
