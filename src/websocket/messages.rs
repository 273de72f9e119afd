//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! clients (donor and admin dashboards) and the BloodNet server.

use serde::{Deserialize, Serialize};

use crate::model::BloodRequest;

/// Topic carrying request list snapshots
pub const REQUESTS_TOPIC: &str = "requests";

/// Topic carrying server notices
pub const SYSTEM_TOPIC: &str = "system";

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// List of topics to subscribe to (e.g., "requests")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// List of topics to unsubscribe from
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The full request list, newest first, as the store currently has it
    RequestsSnapshot { requests: Vec<BloodRequest> },
    /// Subscription confirmed
    Subscribed { topics: Vec<String> },
    /// Unsubscription confirmed
    Unsubscribed { topics: Vec<String> },
    /// Pong response to ping
    Pong,
    /// Server notice (shutdown, backend trouble)
    System { message: String },
    /// Error message
    Error { message: String },
    /// Connection established
    Connected { connection_id: String },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    /// A new request snapshot
    pub fn requests_snapshot(requests: Vec<BloodRequest>) -> Self {
        Self {
            topic: REQUESTS_TOPIC.to_string(),
            message: ServerMessage::RequestsSnapshot { requests },
        }
    }

    /// A system notice
    pub fn system(message: &str) -> Self {
        Self {
            topic: SYSTEM_TOPIC.to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}
