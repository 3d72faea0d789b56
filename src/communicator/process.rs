use crate::communicator::{CommandHandle, RemoteCommand, Result, TransportError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::debug;

/// Local child process whose output is being copied into the writers of a
/// [`RemoteCommand`].
pub(crate) struct ChildCommandHandle {
    child: Child,
    copies: Vec<JoinHandle<()>>,
}

/// Spawns `process` and wires its stdout/stderr to the writers in `command`.
pub(crate) fn spawn_with_outputs(
    mut process: Command,
    command: &mut RemoteCommand,
) -> Result<Box<dyn CommandHandle>> {
    process
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = process.spawn().map_err(|e| TransportError::Start {
        command: command.command.clone(),
        reason: e.to_string(),
    })?;

    let mut copies = Vec::with_capacity(2);
    if let (Some(reader), Some(writer)) = (child.stdout.take(), command.take_stdout()) {
        copies.push(tokio::spawn(copy_stream(reader, writer)));
    }
    if let (Some(reader), Some(writer)) = (child.stderr.take(), command.take_stderr()) {
        copies.push(tokio::spawn(copy_stream(reader, writer)));
    }

    Ok(Box::new(ChildCommandHandle { child, copies }))
}

async fn copy_stream<R>(mut reader: R, mut writer: crate::communicator::OutputWriter)
where
    R: AsyncRead + Unpin,
{
    if let Err(e) = tokio::io::copy(&mut reader, &mut writer).await {
        debug!("Output copy stopped early: {}", e);
    }
    let _ = writer.shutdown().await;
}

#[async_trait]
impl CommandHandle for ChildCommandHandle {
    async fn wait(mut self: Box<Self>) -> Result<i32> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| TransportError::Wait {
                reason: e.to_string(),
            })?;

        for copy in self.copies.drain(..) {
            let _ = copy.await;
        }

        Ok(status.code().unwrap_or(-1))
    }
}
