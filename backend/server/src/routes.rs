use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{self, ConnectInfo, FromRequestParts, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, request::Parts},
};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::AppError,
    models::{
        ConnectionResponse, EntrySummary, JoinRequest, JoinResponse, ListResponse, WaitlistEntry,
        WaitlistStats,
    },
    state::State,
    store::WaitlistStore,
    utils::{bearer_token, client_ip, normalize_email, signup_source, token_matches, user_agent},
};

/// Socket peer, present when served with connect info.
pub struct PeerAddr(pub Option<SocketAddr>);

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

#[instrument(name = "join", skip_all)]
pub async fn join_handler<S: WaitlistStore>(
    extract::State(state): extract::State<Arc<State<S>>>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<JoinResponse>, AppError> {
    let Json(request) = payload.map_err(|e| {
        debug!("Join payload rejected: {e}");
        AppError::MalformedPayload
    })?;

    let email = normalize_email(request.email.as_deref().unwrap_or_default())?;

    if state.store.find_by_email(&email).await?.is_some() {
        debug!("Duplicate signup");
        return Ok(Json(JoinResponse {
            success: true,
            message: "You are already on the waitlist!".to_string(),
            already_exists: Some(true),
            id: None,
        }));
    }

    let entry = WaitlistEntry {
        email,
        timestamp: Utc::now(),
        user_agent: user_agent(&headers),
        ip: client_ip(&headers, peer),
        source: signup_source(request.source.as_deref()),
    };
    let id = state.store.insert(&entry).await?;
    info!(source = %entry.source, "New waitlist signup");

    Ok(Json(JoinResponse {
        success: true,
        message: "Successfully joined the waitlist!".to_string(),
        already_exists: None,
        id: Some(id),
    }))
}

#[instrument(name = "list", skip_all)]
pub async fn list_handler<S: WaitlistStore>(
    extract::State(state): extract::State<Arc<State<S>>>,
    headers: HeaderMap,
) -> Result<Json<ListResponse>, AppError> {
    if !token_matches(bearer_token(&headers), state.config.admin_token.as_deref()) {
        warn!("Unauthorized waitlist access attempt");
        return Err(AppError::Unauthorized);
    }

    let entries = state.store.list_newest_first().await?;
    let stats = WaitlistStats::now(&entries);
    debug!(total = stats.total, "Waitlist listed");

    Ok(Json(ListResponse {
        success: true,
        stats,
        emails: entries.into_iter().map(EntrySummary::from).collect(),
    }))
}

#[instrument(name = "test_connection", skip_all)]
pub async fn connection_handler<S: WaitlistStore>(
    extract::State(state): extract::State<Arc<State<S>>>,
) -> Result<Json<ConnectionResponse>, AppError> {
    let databases = state.store.ping().await?;

    Ok(Json(ConnectionResponse {
        success: true,
        message: "Database connected".to_string(),
        databases,
    }))
}

pub async fn preflight_handler() -> StatusCode {
    StatusCode::OK
}

pub async fn method_not_allowed_handler() -> AppError {
    AppError::MethodNotAllowed
}
