//! server
//!
//! HTTP surface of the service.
//!
//! | Route | Response |
//! |---|---|
//! | `GET /` | `{"message": "doctrace is up and running"}` |
//! | `GET /health` | `{"status": "ok"}` |
//! | `POST /webhook` | GitHub deliveries, see [`webhook`] |
//!
//! Deliveries are verified before anything else is looked at, then parsed,
//! classified, and run through the pipeline while holding the in-process
//! gate. Processing is synchronous: the response reports what happened.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn, Instrument};

use crate::engine::{ErrorKind, Pipeline};
use crate::webhook::{self, Action, Dispatcher, Event};

pub const EVENT_HEADER: &str = "x-github-event";
pub const DELIVERY_HEADER: &str = "x-github-delivery";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Shared state of the router.
pub struct AppState {
    dispatcher: Dispatcher,
    pipeline: Pipeline,
    secret: Vec<u8>,
    /// Serializes pipeline runs.
    gate: Mutex<()>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, pipeline: Pipeline, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            dispatcher,
            pipeline,
            secret: secret.into(),
            gate: Mutex::new(()),
        }
    }
}

/// Body of every `/webhook` response.
#[derive(Debug, Serialize)]
pub struct DeliveryReport {
    pub status: &'static str,
    pub delivery: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    pub detail: String,
}

impl DeliveryReport {
    fn new(status: &'static str, delivery: &str, detail: impl Into<String>) -> Self {
        Self {
            status,
            delivery: delivery.to_string(),
            event: None,
            action: None,
            outcome: None,
            kind: None,
            retryable: None,
            detail: detail.into(),
        }
    }

    fn respond(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhook", post(receive))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "doctrace listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "doctrace is up and running" }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

async fn receive(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let delivery = header(&headers, DELIVERY_HEADER)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let span = tracing::info_span!("delivery", delivery = %delivery);
    handle_delivery(&state, &headers, &body, delivery)
        .instrument(span)
        .await
}

async fn handle_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    delivery: String,
) -> Response {
    if let Err(e) = webhook::verify(&state.secret, body, header(headers, SIGNATURE_HEADER)) {
        warn!(error = %e, "rejected delivery");
        let mut report = DeliveryReport::new("error", &delivery, e.to_string());
        report.kind = Some(ErrorKind::SignatureInvalid.as_str());
        return report.respond(StatusCode::UNAUTHORIZED);
    }

    let event_type = header(headers, EVENT_HEADER).unwrap_or_default();
    let event = match Event::parse(event_type, body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "bad payload");
            return DeliveryReport::new("error", &delivery, e.to_string())
                .respond(StatusCode::BAD_REQUEST);
        }
    };

    let action = state.dispatcher.classify(&event);
    info!(event = event.name(), action = action.label(), "classified delivery");

    let mut report = match &action {
        Action::Pong => DeliveryReport::new("ok", &delivery, "pong"),
        Action::Ignore(reason) => {
            debug!(%reason, "ignoring delivery");
            DeliveryReport::new("ignored", &delivery, reason.to_string())
        }
        Action::GenerateEntry { .. } | Action::Release { .. } => {
            let _gate = state.gate.lock().await;
            match state.pipeline.handle(&action).await {
                Ok(Some(outcome)) => {
                    let mut report = DeliveryReport::new("ok", &delivery, outcome.to_string());
                    report.outcome = Some(outcome.label());
                    report
                }
                Ok(None) => DeliveryReport::new("ok", &delivery, "nothing to do"),
                Err(e) => {
                    let kind = e.kind();
                    error!(error = %e, kind = %kind, "pipeline failed");
                    let mut report = DeliveryReport::new("error", &delivery, e.to_string());
                    report.event = Some(event.name().to_string());
                    report.action = Some(action.label());
                    report.kind = Some(kind.as_str());
                    report.retryable = Some(kind.is_retryable());
                    let status = StatusCode::from_u16(kind.http_status())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    return report.respond(status);
                }
            }
        }
    };
    report.event = Some(event.name().to_string());
    report.action = Some(action.label());
    report.respond(StatusCode::OK)
}
