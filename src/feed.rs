//! Request Feed
//!
//! Snapshot listener over the `requests` collection. The feed keeps the
//! latest ordered request list, refreshes it on a fixed interval and after
//! every write made through the service, and publishes a `requests` event to
//! the WebSocket hub whenever the list changed.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::backend::{BackendError, DocumentStore};
use crate::model::BloodRequest;
use crate::websocket::{ConnectionHub, WsEvent};

/// Configuration for the feed
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// How often to poll the store (in milliseconds)
    pub poll_interval_ms: u64,
    /// Whether background polling runs at all
    pub enabled: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            enabled: true,
        }
    }
}

#[derive(Debug, Default)]
struct FeedState {
    /// `None` until the first successful load
    requests: Option<Vec<BloodRequest>>,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

/// Status of the feed, for health output
#[derive(Debug, Clone)]
pub struct FeedStatus {
    pub loaded: bool,
    pub request_count: usize,
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Keeps the latest request snapshot and pushes changes to subscribers
pub struct RequestFeed {
    store: Arc<dyn DocumentStore>,
    hub: Arc<ConnectionHub>,
    state: RwLock<FeedState>,
    /// Held from read to publish so a slower, older read never lands last
    refresh_lock: Mutex<()>,
    config: FeedConfig,
}

impl RequestFeed {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        hub: Arc<ConnectionHub>,
        config: FeedConfig,
    ) -> Self {
        Self {
            store,
            hub,
            state: RwLock::new(FeedState::default()),
            refresh_lock: Mutex::new(()),
            config,
        }
    }

    /// Start background polling
    ///
    /// Spawns a tokio task that refreshes the snapshot on the configured
    /// interval. The first refresh happens immediately.
    pub fn start_background(self: Arc<Self>) {
        if !self.config.enabled {
            tracing::info!("Request feed polling disabled");
            return;
        }

        tracing::info!(
            interval_ms = self.config.poll_interval_ms,
            "Starting request feed"
        );

        tokio::spawn(async move {
            let interval =
                std::time::Duration::from_millis(self.config.poll_interval_ms.max(100));
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                if let Err(e) = self.refresh().await {
                    tracing::warn!(error = %e, "Request feed refresh failed");
                }
            }
        });
    }

    /// Reload the list from the store
    ///
    /// Returns whether the snapshot changed. Subscribers of the `requests`
    /// topic receive the new list only on change. Refreshes run one at a
    /// time, so one that starts after a write always publishes last.
    pub async fn refresh(&self) -> Result<bool, BackendError> {
        let _serial = self.refresh_lock.lock().await;

        let requests = match self.store.list_requests().await {
            Ok(requests) => requests,
            Err(e) => {
                self.state.write().await.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        let changed = {
            let mut state = self.state.write().await;
            state.last_refresh = Some(Utc::now());
            state.last_error = None;

            if state.requests.as_ref() == Some(&requests) {
                false
            } else {
                state.requests = Some(requests.clone());
                true
            }
        };

        if changed {
            let count = requests.len();
            let delivered = self.hub.publish(WsEvent::requests_snapshot(requests)).await;
            tracing::debug!(
                requests = count,
                subscribers = delivered,
                "Request snapshot changed"
            );
        }

        Ok(changed)
    }

    /// The last loaded snapshot, if any
    pub async fn snapshot(&self) -> Option<Vec<BloodRequest>> {
        self.state.read().await.requests.clone()
    }

    /// The last loaded snapshot, loading it first if the feed has none yet
    pub async fn current_or_refresh(&self) -> Result<Vec<BloodRequest>, BackendError> {
        if let Some(requests) = self.snapshot().await {
            return Ok(requests);
        }

        self.refresh().await?;
        Ok(self.snapshot().await.unwrap_or_default())
    }

    pub async fn status(&self) -> FeedStatus {
        let state = self.state.read().await;
        FeedStatus {
            loaded: state.requests.is_some(),
            request_count: state.requests.as_ref().map(Vec::len).unwrap_or(0),
            last_refresh: state.last_refresh,
            last_error: state.last_error.clone(),
        }
    }
}
