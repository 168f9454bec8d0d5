use crate::error::StoreError;
use crate::ingest::{IngestRequest, Ingestor};
use crate::types::{ReceivedResponse, RecentEventsResponse};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const SERVICE_NAME: &str = "SmarterOS Webhook Handler";
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const DELIVERY_HEADER: &str = "x-github-delivery";

const DEFAULT_EVENTS_LIMIT: u32 = 10;
const MAX_EVENTS_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    ingestor: Arc<Ingestor>,
}

impl AppState {
    pub fn new(ingestor: Ingestor) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/webhooks/test", post(receive_webhook))
        .route("/webhooks/events", get(list_events))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves, letting in-flight
/// requests finish.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
        "endpoints": {
            "webhooks": "/webhooks/test",
            "events": "/webhooks/events",
            "health": "/health",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let database = match state.ingestor.store().ping().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Database ping failed");
            "unavailable"
        }
    };

    Json(json!({
        "status": "healthy",
        "service": "webhook-handler",
        "database": database,
    }))
}

/// Non-empty header value, if present.
///
/// Bytes that are not valid UTF-8 are decoded as Latin-1 rather than
/// dropped, so a present-but-garbled signature still reaches the verifier.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?;
    if value.is_empty() {
        return None;
    }

    match value.to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => Some(value.as_bytes().iter().map(|&b| char::from(b)).collect()),
    }
}

async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = IngestRequest {
        body,
        signature: header_value(&headers, SIGNATURE_HEADER),
        delivery_id: header_value(&headers, DELIVERY_HEADER),
    };

    match state.ingestor.ingest(request).await {
        Ok(receipt) => Json(ReceivedResponse {
            status: "received".to_string(),
            event_id: receipt.event_id,
            delivery_id: receipt.delivery_id,
            message: "Webhook processed successfully".to_string(),
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ListParams {
    limit: Option<u32>,
}

async fn list_events(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<RecentEventsResponse>, StoreError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_EVENTS_LIMIT)
        .clamp(1, MAX_EVENTS_LIMIT);

    let events = state.ingestor.store().list_recent(limit).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list webhook events");
        e
    })?;

    Ok(Json(RecentEventsResponse {
        count: events.len(),
        events,
    }))
}
