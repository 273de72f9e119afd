//! BloodNet API Server
//!
//! Run with: cargo run --bin bloodnet -- --config config.toml
//!
//! Without `--config` the default locations are tried (see
//! [`bloodnet::config::Config::load_default`]). `RUST_LOG` overrides the
//! configured log level.

use anyhow::Context;
use bloodnet::api::{serve, AppState};
use bloodnet::backend::{
    DocumentStore, FirestoreStore, IdentityProvider, IdentityToolkit, MemoryIdentity, MemoryStore,
};
use bloodnet::config::{BackendKind, Config, LoggingConfig};
use bloodnet::websocket::HubConfig;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "bloodnet")]
#[command(about = "BloodNet API server", version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };

    init_logging(&config.logging);

    tracing::info!("Starting BloodNet API server v{}", env!("CARGO_PKG_VERSION"));

    let (store, identity) = build_backend(&config)?;
    tracing::info!(
        store = store.name(),
        identity = identity.name(),
        "Backend initialized"
    );

    if let Err(e) = store.health_check().await {
        tracing::warn!(error = %e, "Document store not reachable yet");
    }

    let state = AppState::new(
        store,
        identity,
        config.session.cache(),
        config.api.server(),
        (&config.feed).into(),
        HubConfig::default(),
    );

    Arc::clone(&state.feed).start_background();

    serve(state).await?;
    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.default_directive().into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.is_json() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

type Backend = (Arc<dyn DocumentStore>, Arc<dyn IdentityProvider>);

fn build_backend(config: &Config) -> anyhow::Result<Backend> {
    match config.backend.kind {
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend; data is lost on restart");
            Ok((Arc::new(MemoryStore::new()), Arc::new(MemoryIdentity::new())))
        }
        BackendKind::Firebase => {
            let firebase = &config.firebase;
            if firebase.api_key.is_empty() && firebase.auth_emulator_host.is_none() {
                anyhow::bail!("[firebase].api_key is required unless an Auth emulator is set");
            }

            let store = FirestoreStore::new(firebase.firestore())
                .context("Failed to create Firestore client")?;
            let identity = IdentityToolkit::new(firebase.identity())
                .context("Failed to create Identity Toolkit client")?;

            tracing::info!(project = %firebase.project_id, "Using Firebase backend");
            Ok((Arc::new(store), Arc::new(identity)))
        }
    }
}
