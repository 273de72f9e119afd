//! # BloodNet
//!
//! Connects blood donors with hospitals posting blood requests. Requests,
//! donor profiles and accounts live in a managed document store and identity
//! service (Firestore and Firebase Authentication); this crate fronts them
//! with an HTTP/WebSocket API, a live request feed, and the view state of the
//! donor and admin portals.
//!
//! ## Modules
//!
//! - [`model`]: Blood requests, profiles, roles and filters
//! - [`forms`]: Input validation for requests, credentials and profiles
//! - [`backend`]: Document store / identity traits, REST clients, in-memory doubles
//! - [`service`]: Account, request and donation operations with role checks
//! - [`feed`]: Live request snapshot pushed to WebSocket subscribers
//! - [`views`]: Portal page state machines and card view models
//! - [`api`]: REST API server with Axum
//! - [`client`]: Typed HTTP client of the API
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bloodnet::api::{serve, ApiConfig, AppState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let state = AppState::in_memory(ApiConfig::default());
//!     serve(state).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod backend;
pub mod client;
pub mod config;
pub mod feed;
pub mod forms;
pub mod model;
pub mod service;
pub mod views;
pub mod websocket;

// Re-export top-level types for convenience
pub use model::{
    BloodRequest, BloodType, DonorProfile, RequestFilter, RequestStatus, Role, Selection, Urgency,
};

pub use forms::{CredentialsForm, FormError, ProfileForm, RequestForm};

pub use backend::{
    AuthError, BackendError, DocumentStore, FirestoreStore, IdentityProvider, IdentityToolkit,
    MemoryIdentity, MemoryStore, Principal, SessionCache,
};

pub use service::{BloodNet, Dashboard, LoginOutcome, ServiceError};

pub use feed::{FeedConfig, FeedStatus, RequestFeed};

pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use client::{ApiClient, ClientConfig, ClientError};

pub use views::{AdminView, DonorView, Notification, Portal};

pub use websocket::{
    websocket_handler, ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent,
};

pub use config::{
    ApiConfig as ConfigApiConfig, BackendKind, Config, ConfigError, FirebaseConfig, LoggingConfig,
};
