//! WebSocket Handler
//!
//! Upgrades `/api/v1/ws` and runs one connection: a send task draining the
//! hub channel into the socket, and a receive task handling client messages.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::hub::ConnectionHub;
use super::messages::{ClientMessage, ServerMessage, REQUESTS_TOPIC};
use crate::api::AppState;
use crate::feed::RequestFeed;

/// WebSocket upgrade handler
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    let hub = Arc::clone(&state.ws_hub);
    let feed = Arc::clone(&state.feed);
    ws.on_upgrade(move |socket| handle_socket(socket, hub, feed))
}

fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize message");
            None
        }
    }
}

/// State shared by the receive side of one connection
struct Connection {
    id: String,
    hub: Arc<ConnectionHub>,
    feed: Arc<RequestFeed>,
}

impl Connection {
    async fn reply(&self, message: ServerMessage) {
        if let Err(e) = self.hub.send_to(&self.id, message).await {
            tracing::debug!(connection_id = %self.id, error = %e, "Reply dropped");
        }
    }

    async fn error(&self, message: impl Into<String>) {
        self.reply(ServerMessage::Error {
            message: message.into(),
        })
        .await;
    }

    /// Handle a frame; returns false when the connection should close
    async fn on_frame(&self, frame: Message) -> bool {
        match frame {
            Message::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => self.on_message(message).await,
                    Err(e) => {
                        tracing::debug!(
                            connection_id = %self.id,
                            error = %e,
                            "Invalid client message"
                        );
                        self.error(format!("Invalid message format: {e}")).await;
                    }
                }
                true
            }
            Message::Binary(_) => {
                self.error("Binary messages not supported").await;
                true
            }
            // Axum answers pings itself
            Message::Ping(_) | Message::Pong(_) => true,
            Message::Close(_) => {
                tracing::debug!(connection_id = %self.id, "Client requested close");
                false
            }
        }
    }

    async fn on_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::Subscribe { topics } => {
                match self.hub.subscribe(&self.id, topics).await {
                    Ok(subscribed) => {
                        let wants_requests = subscribed.iter().any(|t| t == REQUESTS_TOPIC);
                        self.reply(ServerMessage::Subscribed { topics: subscribed })
                            .await;
                        if wants_requests {
                            self.send_current_snapshot().await;
                        }
                    }
                    Err(e) => {
                        tracing::error!(connection_id = %self.id, error = %e, "Subscribe error");
                        self.error(e.to_string()).await;
                    }
                }
            }
            ClientMessage::Unsubscribe { topics } => {
                match self.hub.unsubscribe(&self.id, topics).await {
                    Ok(unsubscribed) => {
                        self.reply(ServerMessage::Unsubscribed {
                            topics: unsubscribed,
                        })
                        .await;
                    }
                    Err(e) => {
                        tracing::error!(connection_id = %self.id, error = %e, "Unsubscribe error");
                        self.error(e.to_string()).await;
                    }
                }
            }
            ClientMessage::Ping => self.reply(ServerMessage::Pong).await,
        }
    }

    /// A new `requests` subscriber starts from the current list
    async fn send_current_snapshot(&self) {
        match self.feed.current_or_refresh().await {
            Ok(requests) => {
                self.reply(ServerMessage::RequestsSnapshot { requests }).await;
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %self.id,
                    error = %e,
                    "Initial snapshot unavailable"
                );
                self.error("Requests are temporarily unavailable").await;
            }
        }
    }
}

async fn handle_socket(socket: WebSocket, hub: Arc<ConnectionHub>, feed: Arc<RequestFeed>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match hub.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!(error = %e, "Failed to register WebSocket connection");
            if let Some(text) = encode(&ServerMessage::Error {
                message: e.to_string(),
            }) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let greeted = match encode(&connected) {
        Some(text) => sender.send(Message::Text(text)).await.is_ok(),
        None => false,
    };
    if !greeted {
        tracing::error!(connection_id = %connection_id, "Failed to send connected message");
        hub.unregister(&connection_id).await;
        return;
    }

    let send_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Some(text) = encode(&message) else {
                continue;
            };
            if sender.send(Message::Text(text)).await.is_err() {
                tracing::debug!(
                    connection_id = %send_id,
                    "WebSocket send failed, closing connection"
                );
                break;
            }
        }
    });

    let connection = Connection {
        id: connection_id.clone(),
        hub: Arc::clone(&hub),
        feed,
    };
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(frame) => {
                    if !connection.on_frame(frame).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection.id,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&connection_id).await;
}
