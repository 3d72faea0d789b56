use crate::provision::Output;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

/// Forwards one output stream of a running command to an [`Output`], one call
/// per line.
pub struct StreamRelay;

impl StreamRelay {
    /// Runs the relay on its own task. The returned handle completes once the
    /// reader reported end of stream and every line has been emitted.
    pub fn spawn<R>(reader: R, sink: Arc<dyn Output>) -> JoinHandle<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        tokio::spawn(async move { relay(reader, sink.as_ref()).await })
    }
}

/// Reads `reader` to the end, emitting each line without its terminator. A
/// final line without a trailing newline is still emitted. Invalid UTF-8 is
/// replaced rather than dropped.
pub async fn relay<R>(reader: R, sink: &dyn Output)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                sink.output(&String::from_utf8_lossy(&buf));
            }
            Err(e) => {
                debug!("Output relay stopped: {}", e);
                break;
            }
        }
    }
}
