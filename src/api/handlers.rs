//! HTTP handlers for the relay endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::debug;

use super::types::{ErrorResponse, StatusResponse};
use crate::broker::Broker;
use crate::error::RelayError;
use crate::message::Message;

/// Forwarding header consulted for the caller address.
const FORWARDED_FOR: &str = "x-forwarded-for";
/// Optional caller-identity header.
const CLIENT_ID: &str = "x-client-id";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub broker: Arc<Broker>,
    /// Upper bound on the declared relay body size, in bytes.
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(broker: Arc<Broker>, max_body_bytes: usize) -> Self {
        Self {
            broker,
            max_body_bytes,
        }
    }
}

/// Status/introspection endpoint: server identity and live session count.
pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(state.broker.session_count()))
}

/// The relay endpoint.
///
/// Framing is enforced here rather than by router layers so that every
/// violation gets the same uniform rejection: non-POST, absent or
/// non-positive declared length, oversized body, non-object JSON, and an
/// unknown session are indistinguishable to the caller.
pub async fn relay(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    if req.method() != Method::POST {
        return reject();
    }

    let declared = req
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    let declared = match declared {
        Some(n) if n > 0 => n,
        _ => return reject(),
    };
    // Compared as u64: a declared length past usize on a 32-bit target must
    // not wrap below the bound.
    if declared > state.max_body_bytes as u64 {
        return reject();
    }

    let client = client_addr(req.headers(), peer);
    let client_id = req
        .headers()
        .get(CLIENT_ID)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let body = match axum::body::to_bytes(req.into_body(), state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => return reject(),
    };

    let mut msg = match Message::from_slice(&body) {
        Ok(msg) => msg,
        Err(err) => {
            debug!(%err, "unparseable relay body");
            return reject();
        }
    };
    msg.annotate(&client, client_id.as_deref());

    match state.broker.relay(msg).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Uniform rejection response. Same status, same body, no internal detail.
fn reject() -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse::rejected())).into_response()
}

/// Caller address: first entry of the forwarding header if present, else the
/// transport-level peer address.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get(FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

fn error_response(err: RelayError) -> Response {
    match err {
        // "Start a new session" cases share the uniform rejection.
        RelayError::SessionNotFound(_)
        | RelayError::MalformedMessage(_)
        | RelayError::WorkerGone => reject(),
        RelayError::SessionBusy => {
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::busy())).into_response()
        }
        RelayError::ReplyTimeout => {
            (StatusCode::GATEWAY_TIMEOUT, Json(ErrorResponse::timeout())).into_response()
        }
        RelayError::AtCapacity | RelayError::WorkerSpawn(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::unavailable()),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(other.to_string())),
        )
            .into_response(),
    }
}
