//! WebSocket Real-Time Streaming
//!
//! Pushes request list snapshots to donor and admin dashboards.
//!
//! ## Architecture
//!
//! - **ConnectionHub**: Manages all active connections and subscriptions
//! - **Handler**: Handles WebSocket upgrade and message processing
//! - **Messages**: Defines client and server message formats
//!
//! ## Usage
//!
//! Clients connect to `/api/v1/ws` and can subscribe to topics:
//! - `requests` - Full request list, newest first, whenever it changes
//! - `system` - Server notices
//!
//! Subscribing to `requests` immediately delivers the current list.
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/api/v1/ws');
//! ws.onopen = () => ws.send(JSON.stringify({type: 'subscribe', topics: ['requests']}));
//! ws.onmessage = (event) => render(JSON.parse(event.data));
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{is_valid_topic, ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent, REQUESTS_TOPIC, SYSTEM_TOPIC};
