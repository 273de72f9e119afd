//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::{DocumentStore, IdentityProvider, SessionCache};
use crate::feed::{FeedConfig, RequestFeed};
use crate::service::BloodNet;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Donor and admin operations
    pub service: Arc<BloodNet>,
    /// Latest request snapshot
    pub feed: Arc<RequestFeed>,
    /// WebSocket connection hub for real-time snapshots
    pub ws_hub: Arc<ConnectionHub>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire the service, feed and hub over the given backend
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        sessions: SessionCache,
        config: ApiConfig,
        feed_config: FeedConfig,
        hub_config: HubConfig,
    ) -> Self {
        let ws_hub = Arc::new(ConnectionHub::new(hub_config));
        let feed = Arc::new(RequestFeed::new(
            Arc::clone(&store),
            Arc::clone(&ws_hub),
            feed_config,
        ));
        let service = Arc::new(BloodNet::new(
            store,
            identity,
            Arc::new(sessions),
            Arc::clone(&feed),
        ));

        Self {
            service,
            feed,
            ws_hub,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// State over the in-memory backend, with background polling off
    pub fn in_memory(config: ApiConfig) -> Self {
        Self::new(
            Arc::new(crate::backend::MemoryStore::new()),
            Arc::new(crate::backend::MemoryIdentity::new()),
            SessionCache::default(),
            config,
            FeedConfig {
                enabled: false,
                ..Default::default()
            },
            HubConfig::default(),
        )
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get WebSocket connection count
    pub async fn ws_connection_count(&self) -> usize {
        self.ws_hub.connection_count().await
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Allowed browser origins; empty allows any
    pub cors_origins: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout_ms: 30_000,
            max_body_size: 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
