use crate::communicator::{Connection, RemoteCommand};
use crate::provision::{Output, ProvisionError, Result, StreamRelay};
use std::sync::Arc;
use tracing::{debug, warn};

/// Capacity of each in-memory output pipe
const PIPE_CAPACITY: usize = 64 * 1024;

/// Runs one command over a connection and relays its output.
pub struct RemoteExecutor {
    output: Arc<dyn Output>,
}

impl RemoteExecutor {
    pub fn new(output: Arc<dyn Output>) -> Self {
        Self { output }
    }

    /// Runs `command` to completion.
    ///
    /// Returns only after both output relays have seen end of stream. A
    /// non-zero exit status becomes [`ProvisionError::CommandFailed`].
    pub async fn run(&self, connection: &mut dyn Connection, command: &str) -> Result<()> {
        debug!("Running remote command: {}", command);

        let (stdout_writer, stdout_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let (stderr_writer, stderr_reader) = tokio::io::duplex(PIPE_CAPACITY);
        let stdout_relay = StreamRelay::spawn(stdout_reader, self.output.clone());
        let stderr_relay = StreamRelay::spawn(stderr_reader, self.output.clone());

        let mut remote = RemoteCommand::new(
            command,
            Box::new(stdout_writer),
            Box::new(stderr_writer),
        );

        let handle = match connection.start(&mut remote).await {
            Ok(handle) => handle,
            Err(e) => {
                remote.close_outputs();
                stdout_relay.abort();
                stderr_relay.abort();
                return Err(e.into());
            }
        };

        let waited = handle.wait().await;

        remote.close_outputs();
        for relay in [stdout_relay, stderr_relay] {
            if let Err(e) = relay.await {
                warn!("Output relay for {:?} ended abnormally: {}", command, e);
            }
        }

        let status = waited?;
        remote.set_exit_status(status);
        match status {
            0 => Ok(()),
            status => Err(ProvisionError::CommandFailed {
                command: remote.command,
                status,
            }),
        }
    }
}
