//! Scoreboard server listener
//!
//! Runs the broadcast hub, the WebSocket accept loop and the static asset
//! listener, and spawns one session task per display page.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::hub::{BroadcastHub, HubHandle, SubscriberId};
use crate::server::assets::serve_assets;
use crate::server::config::ServerConfig;
use crate::server::connection::serve_subscriber;

/// Scoreboard server
pub struct ScoreboardServer {
    config: ServerConfig,
    hub: Option<BroadcastHub>,
    handle: HubHandle,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl ScoreboardServer {
    /// Create a new server with the given configuration
    ///
    /// The hub handle is usable right away; updates published before the
    /// server runs are queued.
    pub fn new(config: ServerConfig) -> Self {
        let (hub, handle) = BroadcastHub::new(config.hub_config());

        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            hub: Some(hub),
            handle,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Handle for publishing updates
    pub fn hub(&self) -> HubHandle {
        self.handle.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind both listeners and run until `shutdown` resolves
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let ws_listener = TcpListener::bind(self.config.ws_addr).await?;
        let http_listener = match self.config.asset_dir {
            Some(_) => Some(TcpListener::bind(self.config.http_addr).await?),
            None => None,
        };

        self.run_with_listeners(ws_listener, http_listener, shutdown)
            .await
    }

    /// Run on already bound listeners until `shutdown` resolves
    ///
    /// The asset listener is only served when an asset directory is configured.
    pub async fn run_with_listeners<F>(
        mut self,
        ws_listener: TcpListener,
        http_listener: Option<TcpListener>,
        shutdown: F,
    ) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let hub = self
            .hub
            .take()
            .ok_or_else(|| Error::Config("server hub already running".into()))?;
        let hub_task = tokio::spawn(hub.run());

        let assets_task = match (http_listener, self.config.asset_dir.clone()) {
            (Some(listener), Some(root)) => {
                tracing::info!(
                    addr = %listener.local_addr()?,
                    root = %root.display(),
                    "Asset server listening"
                );
                Some(tokio::spawn(serve_assets(
                    listener,
                    root,
                    self.config.handshake_timeout,
                )))
            }
            _ => None,
        };

        tracing::info!(addr = %ws_listener.local_addr()?, "WebSocket server listening");

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&ws_listener) => result,
        };

        if let Some(task) = assets_task {
            task.abort();
        }
        hub_task.abort();

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        let id = SubscriberId::new(session_id, peer_addr);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let hub = self.handle.clone();
        let handshake_timeout = self.config.handshake_timeout;

        tokio::spawn(async move {
            // Held for the lifetime of the session
            let _permit = permit;

            if let Err(e) = serve_subscriber(socket, id, hub, handshake_timeout).await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}
