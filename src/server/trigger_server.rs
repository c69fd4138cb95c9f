// src/server/trigger_server.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::ServerSection;
use crate::errors::{Result, ScriptdError};
use crate::exec::{ScriptLauncher, StartOutcome};
use crate::registry::{ScriptRegistry, TriggerTable};
use crate::server::protocol::{self, ReadLimits};

/// Per-connection behaviour of the trigger server.
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerOptions {
    pub limits: ReadLimits,
    /// Report toggle-offs and launch failures in the reply line.
    pub detailed_replies: bool,
}

impl ServerOptions {
    pub fn from_config(server: &ServerSection) -> Self {
        Self {
            limits: ReadLimits {
                max_bytes: server.max_request_bytes,
                read_timeout: Duration::from_millis(server.read_timeout_ms),
                idle_timeout: Duration::from_millis(server.idle_timeout_ms),
            },
            detailed_replies: server.detailed_replies,
        }
    }
}

struct ServerState {
    table: TriggerTable,
    registry: Arc<ScriptRegistry>,
    launcher: Arc<dyn ScriptLauncher>,
    options: ServerOptions,
}

/// TCP listener mapping trigger tokens to script starts.
pub struct TriggerServer {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl TriggerServer {
    /// Bind the listener.
    ///
    /// Failing to bind is fatal for the trigger subsystem and is returned as
    /// [`ScriptdError::Bind`].
    pub async fn bind(
        addr: &str,
        registry: Arc<ScriptRegistry>,
        launcher: Arc<dyn ScriptLauncher>,
        options: ServerOptions,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ScriptdError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        let table = TriggerTable::from_registry(&registry);
        info!(
            addr = %listener.local_addr()?,
            tokens = table.len(),
            "trigger server listening"
        );

        Ok(Self {
            listener,
            state: Arc::new(ServerState {
                table,
                registry,
                launcher,
                options,
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever, each handled on its own task.
    pub async fn serve(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(%peer, "client connected");
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, &state).await {
                            warn!(%peer, error = %e, "trigger connection failed");
                        }
                    });
                }
                Err(e) => {
                    // Usually resource exhaustion (EMFILE); back off briefly.
                    error!(error = %e, "accepting trigger connection failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.serve())
    }
}

async fn handle_connection(mut stream: TcpStream, state: &ServerState) -> anyhow::Result<()> {
    let raw = protocol::read_request(&mut stream, &state.options.limits)
        .await
        .context("reading trigger token")?;
    let token = protocol::parse_token(&raw);
    debug!(%token, "received trigger message");

    let reply = dispatch(state, &token).await;

    stream
        .write_all(reply.as_bytes())
        .await
        .context("writing trigger reply")?;
    stream.shutdown().await.context("closing trigger connection")?;
    Ok(())
}

/// Resolve `token` and start the matching script; returns the reply line.
async fn dispatch(state: &ServerState, token: &str) -> String {
    let Some(entry) = state.table.lookup(token.as_bytes()) else {
        info!(%token, "unknown trigger message");
        return protocol::INVALID_MESSAGE_REPLY.to_string();
    };

    let file_name = state
        .registry
        .get(&entry.id)
        .map(|def| def.file_name())
        .unwrap_or_else(|| entry.id.to_string());

    info!(script = %entry.id, args = ?entry.args, "trigger matched; starting script");

    let outcome = match state
        .launcher
        .start_script(entry.id.clone(), Some(entry.args.clone()))
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(script = %entry.id, error = %e, "could not reach supervisor");
            StartOutcome::LaunchError(e.to_string())
        }
    };
    debug!(script = %entry.id, ?outcome, "trigger dispatched");

    protocol::reply_for_outcome(&outcome, &file_name, state.options.detailed_replies)
}
