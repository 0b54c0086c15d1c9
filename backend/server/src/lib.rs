//! Documentation of a waitlist signup service.
//!
//! A landing page posts an email, the service stores it once, and an admin
//! reads the collected list back with a few counters.
//!
//!
//!
//! # General Infrastructure
//! - Single axum process behind the hosting platform's proxy
//! - One MongoDB collection, `waitlist`, one document per normalized email
//! - Connection is dialed lazily by the first request that needs it, then reused
//! - No background work, every handler is a plain request/response
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Auth | Description |
//! |---|---|---|---|
//! | POST | `/api/join-waitlist` | none | Add an email, idempotent per address |
//! | OPTIONS | `/api/join-waitlist` | none | CORS pre-flight, empty 200 |
//! | GET | `/api/get-waitlist` | `Bearer $ADMIN_TOKEN` | All signups, newest first, with counters |
//! | GET | `/api/test-connection` | none | Ping the database and list database names |
//!
//! Errors are always `{ "success": false, "error": "..." }`. Server faults only
//! say `Internal server error`, the cause goes to the log.
//!
//!
//!
//! # Deduplication
//! - Emails must match `local@domain.tld` as sent, then are lower-cased before lookup and insert
//! - A repeated join answers `alreadyExists: true` with the same 200 shape
//! - Lookup then insert is not atomic. Two simultaneous joins for one address
//!   can both insert, accepted for a low traffic signup form
//!
//!
//!
//! # Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `RUST_PORT` | `1111` |
//! | `MONGODB_URI` | none, requests fail with 500 until set |
//! | `MONGODB_DB` | `kabbalah-code` |
//! | `MONGODB_MAX_POOL_SIZE` | `10` |
//! | `ADMIN_TOKEN` | none, listing always answers 401 |
//!
//! `MONGODB_URI` and `ADMIN_TOKEN` are also read from `/run/secrets/<NAME>`.
//!
//!
//!
//! # Setup
//!
//! Run locally.
//! ```sh
//! MONGODB_URI=mongodb://localhost:27017 ADMIN_TOKEN=dev RUST_LOG=info cargo run -p waitlist
//! ```
//!
//! Join.
//! ```sh
//! curl -X POST localhost:1111/api/join-waitlist -H 'content-type: application/json' -d '{"email":"me@example.com"}'
//! ```
//!
//! List.
//! ```sh
//! curl localhost:1111/api/get-waitlist -H "Authorization: Bearer dev"
//! ```
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod stats;
pub mod store;
pub mod utils;

use config::Config;
use routes::{
    connection_handler, join_handler, list_handler, method_not_allowed_handler, preflight_handler,
};
use state::State;
use store::WaitlistStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub async fn start_server() -> Result<(), BoxError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;
    let state = State::new(config);

    info!("Starting server...");
    let app = build_router(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutting down...");
    state.store.provider().disconnect().await;

    Ok(())
}

pub fn build_router<S: WaitlistStore>(state: Arc<State<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(
            "/api/join-waitlist",
            post(join_handler::<S>)
                .options(preflight_handler)
                .layer(cors),
        )
        .route("/api/get-waitlist", get(list_handler::<S>))
        .route("/api/test-connection", get(connection_handler::<S>))
        .method_not_allowed_fallback(method_not_allowed_handler)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
