//! Server configuration

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::hub::HubConfig;

/// Default WebSocket port for display pages
pub const DEFAULT_WS_PORT: u16 = 9000;

/// Default static asset port
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// WebSocket listener address
    pub ws_addr: SocketAddr,

    /// Static asset listener address
    pub http_addr: SocketAddr,

    /// Directory served by the asset listener (`None` disables it)
    pub asset_dir: Option<PathBuf>,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_connections: usize,

    /// Payloads buffered per subscriber
    pub subscriber_queue_capacity: usize,

    /// Hub housekeeping interval
    pub housekeeping_interval: Duration,

    /// WebSocket handshake and asset request head must complete within this time
    pub handshake_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_WS_PORT)),
            http_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_HTTP_PORT)),
            asset_dir: None,
            max_connections: 0, // Unlimited
            subscriber_queue_capacity: 32,
            housekeeping_interval: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            tcp_nodelay: true, // Updates are tiny and latency-sensitive
        }
    }
}

impl ServerConfig {
    /// Set the WebSocket listener address
    pub fn ws_addr(mut self, addr: SocketAddr) -> Self {
        self.ws_addr = addr;
        self
    }

    /// Set the static asset listener address
    pub fn http_addr(mut self, addr: SocketAddr) -> Self {
        self.http_addr = addr;
        self
    }

    /// Serve static assets from a directory
    pub fn asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = Some(dir.into());
        self
    }

    /// Set maximum concurrent subscribers
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-subscriber queue capacity (at least 1)
    pub fn subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity.max(1);
        self
    }

    /// Set the hub housekeeping interval
    pub fn housekeeping_interval(mut self, interval: Duration) -> Self {
        self.housekeeping_interval = interval;
        self
    }

    /// Set the WebSocket handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Hub settings derived from this configuration
    pub fn hub_config(&self) -> HubConfig {
        HubConfig::default()
            .queue_capacity(self.subscriber_queue_capacity)
            .housekeeping_interval(self.housekeeping_interval)
    }
}
