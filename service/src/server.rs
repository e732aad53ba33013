//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Chat server
//!
//! [`ChatServer`] owns the TCP listener and the accept loop. Each accepted
//! socket is split: the read half goes to a new [`Reader`] task and the write
//! half becomes the session's [`Connection`].

use crate::{
    ChatError, Connection, Reader, Result, ServerConfig, ServerMetrics, ServerSnapshot,
    SessionContext,
};
use chatline_backend::{Backend, SystemMessage};
use metrics::{counter, gauge};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP chat server
///
/// # Example
///
/// ```no_run
/// use chatline_backend::MemoryBackend;
/// use chatline_service::{ChatServer, ServerConfig};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default();
///     let server = ChatServer::new(config, Arc::new(MemoryBackend::new())).await?;
///
///     server.start().await?;
///     tokio::signal::ctrl_c().await?;
///     server.shutdown().await?;
///     Ok(())
/// }
/// ```
pub struct ChatServer {
    config: ServerConfig,
    ctx: SessionContext,
    listener: Mutex<Option<TcpListener>>,
    bind_address: SocketAddr,
    started_at: Instant,
    running: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ChatServer {
    /// Bind the configured address without accepting yet
    pub async fn new(config: ServerConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        config.validate().map_err(ChatError::Other)?;

        let listener = TcpListener::bind(config.bind_address).await?;
        let bind_address = listener.local_addr()?;
        let ctx = SessionContext::new(&config, backend);

        info!(%bind_address, "Chat server bound");

        Ok(Self {
            config,
            ctx,
            listener: Mutex::new(Some(listener)),
            bind_address,
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Mutex::new(None),
        })
    }

    /// Start accepting connections
    ///
    /// A server can be started once.
    pub async fn start(&self) -> Result<()> {
        let Some(listener) = self.listener.lock().await.take() else {
            return Err(ChatError::Other("Server already started".to_string()));
        };
        self.running.store(true, Ordering::SeqCst);

        info!(bind_address = %self.bind_address, "Starting chat server");
        let handle = tokio::spawn(accept_loop(
            listener,
            self.ctx.clone(),
            self.config.max_connections,
            self.shutdown_notify.clone(),
        ));
        *self.accept_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Stop accepting, end every session and close all connections
    pub async fn shutdown(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(ChatError::ServerNotRunning);
        }

        info!("Shutting down chat server");
        self.ctx
            .registry
            .broadcast_system_message(&SystemMessage::new("server is shutting down"))
            .await;
        self.shutdown_notify.notify_one();

        if let Some(handle) = self.accept_handle.lock().await.take()
            && tokio::time::timeout(self.config.shutdown_timeout, handle)
                .await
                .is_err()
        {
            warn!("Accept loop did not stop in time");
        }

        self.ctx.registry.close_all().await;
        info!("Chat server shutdown complete");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address actually bound, useful with port `0`
    pub fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    /// Number of sessions currently running
    pub fn connection_count(&self) -> usize {
        self.ctx.metrics.active_connections() as usize
    }

    pub fn snapshot(&self) -> ServerSnapshot {
        ServerSnapshot {
            active_connections: self.connection_count(),
            total_connections: self.ctx.metrics.total_connections(),
            bind_address: self.bind_address,
            uptime: self.started_at.elapsed(),
            started_at: self.started_at,
        }
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.ctx.metrics.clone()
    }

    /// Shared services handed to every session
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: SessionContext,
    max_connections: usize,
    shutdown: Arc<Notify>,
) {
    let mut sessions = JoinSet::new();

    loop {
        let accepted = tokio::select! {
            result = listener.accept() => result,
            () = shutdown.notified() => break,
            Some(joined) = sessions.join_next(), if !sessions.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "Session task failed");
                }
                continue;
            }
        };

        let (socket, peer_addr) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };

        if let Err(e) = check_capacity(ctx.metrics.active_connections() as usize, max_connections) {
            warn!(%peer_addr, error = %e, "Rejecting connection");
            ctx.metrics.connection_rejected();
            counter!("chatline.connections.rejected").increment(1);
            drop(socket);
            continue;
        }

        if let Err(e) = socket.set_nodelay(true) {
            debug!(%peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }

        ctx.metrics.connection_opened();
        gauge!("chatline.connections.active").increment(1.0);
        debug!(%peer_addr, "Accepted connection");

        let (input, output) = socket.into_split();
        let reader = Reader::new(input, Connection::new(peer_addr.to_string(), output), ctx.clone());
        let metrics = ctx.metrics.clone();
        sessions.spawn(async move {
            let started = Instant::now();
            let _ = reader.run().await;
            metrics.connection_closed(started.elapsed());
            gauge!("chatline.connections.active").decrement(1.0);
        });
    }

    sessions.shutdown().await;
    info!("Accept loop terminated");
}

/// Admit one more connection only while fewer than `max` are active
fn check_capacity(active: usize, max: usize) -> Result<()> {
    if active >= max {
        return Err(ChatError::MaxConnectionsReached(max));
    }
    Ok(())
}

impl std::fmt::Debug for ChatServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatServer")
            .field("bind_address", &self.bind_address)
            .field("running", &self.is_running())
            .field("connection_count", &self.connection_count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for ChatServer {
    fn drop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            warn!("ChatServer dropped while still running");
            self.shutdown_notify.notify_one();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_backend::MemoryBackend;

    async fn server() -> ChatServer {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap());
        ChatServer::new(config, Arc::new(MemoryBackend::new()))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_server_lifecycle() {
        let server = server().await;
        assert!(!server.is_running());

        server.start().await.unwrap();
        assert!(server.is_running());

        server.shutdown().await.unwrap();
        assert!(!server.is_running());
        assert!(matches!(server.shutdown().await, Err(ChatError::ServerNotRunning)));
    }

    #[test]
    fn test_check_capacity() {
        assert!(check_capacity(0, 1).is_ok());
        assert!(check_capacity(999, 1000).is_ok());
        assert!(matches!(
            check_capacity(1000, 1000),
            Err(ChatError::MaxConnectionsReached(1000))
        ));
    }

    #[tokio::test]
    async fn test_server_double_start() {
        let server = server().await;
        server.start().await.unwrap();
        assert!(server.start().await.is_err());
        server.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_server_snapshot() {
        let server = server().await;
        let snapshot = server.snapshot();

        assert_eq!(snapshot.active_connections, 0);
        assert_eq!(snapshot.total_connections, 0);
        assert_ne!(snapshot.bind_address.port(), 0);
        assert!(snapshot.to_string().starts_with("ChatServer {"));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_max_connections(0);
        let result = ChatServer::new(config, Arc::new(MemoryBackend::new())).await;
        assert!(matches!(result, Err(ChatError::Other(_))));
    }
}
