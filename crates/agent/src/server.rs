//! Line-delimited JSON transport over stdio or a Unix socket.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::UnixListener;
use tracing::{debug, error, info};

use crate::TaskDependencyAgent;

/// Serves agent requests, one JSON envelope per line in each direction.
#[derive(Clone)]
pub struct AgentServer {
    agent: Arc<TaskDependencyAgent>,
}

impl AgentServer {
    /// Create a server for `agent`.
    pub fn new(agent: Arc<TaskDependencyAgent>) -> Self {
        Self { agent }
    }

    /// Get a reference to the served agent.
    pub fn agent(&self) -> &TaskDependencyAgent {
        &self.agent
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> anyhow::Result<()> {
        info!("Starting agent '{}' (stdio transport)", self.agent.agent_id());
        self.serve_stream(tokio::io::stdin(), tokio::io::stdout()).await?;
        info!("Agent stopped");
        Ok(())
    }

    /// Serve a Unix socket until Ctrl-C.
    pub async fn serve_socket(&self, socket_path: &Path) -> anyhow::Result<()> {
        self.serve_socket_until(socket_path, async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    }

    /// Serve a Unix socket until `shutdown` completes.
    ///
    /// Each connection runs on its own task. A stale socket file at
    /// `socket_path` is replaced.
    pub async fn serve_socket_until<F>(&self, socket_path: &Path, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            "Starting agent '{}' (socket transport at {})",
            self.agent.agent_id(),
            socket_path.display()
        );

        if socket_path.exists() {
            std::fs::remove_file(socket_path)?;
        }
        let listener = UnixListener::bind(socket_path)?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, _)) => {
                            let server = self.clone();
                            tokio::spawn(async move {
                                let (reader, writer) = stream.into_split();
                                if let Err(e) = server.serve_stream(reader, writer).await {
                                    error!("Connection failed: {}", e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = &mut shutdown => {
                    break;
                }
            }
        }

        if let Err(e) = std::fs::remove_file(socket_path) {
            debug!("Could not remove socket file: {}", e);
        }
        info!("Agent stopped");
        Ok(())
    }

    /// Answer every line of `reader` on `writer` until end of input.
    ///
    /// Blank lines are skipped. Every other line gets exactly one response
    /// line, flushed before the next request is read.
    pub async fn serve_stream<R, W>(&self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        let mut writer = BufWriter::new(writer);

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = self.agent.handle_line(&line).await;
            let response_json = serde_json::to_string(&response)?;

            writer.write_all(response_json.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        Ok(())
    }
}
