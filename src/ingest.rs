//! The ingestion pipeline: authenticate, parse, normalize, persist.
//!
//! Kept independent of axum so the whole flow can be driven directly; the
//! HTTP layer only extracts headers and the raw body and maps the outcome.

use std::sync::Arc;

use bytes::Bytes;
use chrono::SecondsFormat;
use serde_json::{Map, Value};
use tracing::{error, info, instrument, warn};

use crate::clock::Clock;
use crate::error::IngestError;
use crate::store::EventStore;
use crate::types::{NewWebhookEvent, DEFAULT_EVENT_TYPE, UNKNOWN_DELIVERY};
use crate::verification::Verifier;

/// One inbound delivery as received off the wire.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    /// Raw body bytes, exactly as sent. Signatures are checked over these.
    pub body: Bytes,
    /// `X-Hub-Signature-256` header value, if any.
    pub signature: Option<String>,
    /// `X-GitHub-Delivery` header value, if any.
    pub delivery_id: Option<String>,
}

/// What the caller learns about an accepted delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub event_id: i64,
    pub delivery_id: String,
    pub event_type: String,
}

pub struct Ingestor {
    verifier: Verifier,
    store: EventStore,
    clock: Arc<dyn Clock>,
    require_signature: bool,
}

impl Ingestor {
    pub fn new(verifier: Verifier, store: EventStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            verifier,
            store,
            clock,
            require_signature: false,
        }
    }

    /// Reject unsigned deliveries instead of accepting them unauthenticated.
    pub fn require_signature(mut self, require: bool) -> Self {
        self.require_signature = require;
        self
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Run one delivery through the pipeline.
    ///
    /// Any failure before the insert leaves storage untouched; success means
    /// exactly one new row.
    #[instrument(
        name = "ingest_webhook",
        skip(self, request),
        fields(
            delivery_id = request.delivery_id.as_deref().unwrap_or(UNKNOWN_DELIVERY),
            body_len = request.body.len(),
        )
    )]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestReceipt, IngestError> {
        self.authenticate(&request)?;

        let payload = parse_payload(&request.body).map_err(|e| {
            error!(error = %e, "Failed to parse JSON");
            IngestError::MalformedPayload(e)
        })?;

        let event = normalize(request.delivery_id, payload, self.clock.as_ref());

        info!(
            delivery_id = %event.delivery_id,
            event_type = %event.event_type,
            "Webhook received"
        );

        let event_id = self.store.insert(&event).await.map_err(|e| {
            error!(error = %e, "Failed to persist webhook event");
            IngestError::Storage(e)
        })?;

        info!(event_id, "Webhook event stored");

        Ok(IngestReceipt {
            event_id,
            delivery_id: event.delivery_id,
            event_type: event.event_type,
        })
    }

    fn authenticate(&self, request: &IngestRequest) -> Result<(), IngestError> {
        let delivery = request.delivery_id.as_deref().unwrap_or(UNKNOWN_DELIVERY);

        match request.signature.as_deref() {
            Some(signature) => {
                if !self.verifier.verify(&request.body, Some(signature)) {
                    warn!(delivery_id = %delivery, "Invalid signature for delivery");
                    return Err(IngestError::InvalidSignature);
                }
                Ok(())
            }
            None if self.require_signature => {
                warn!(delivery_id = %delivery, "Unsigned delivery rejected");
                Err(IngestError::MissingSignature)
            }
            None => Ok(()),
        }
    }
}

/// Parse the body as a JSON object; any other top-level value is rejected.
fn parse_payload(body: &[u8]) -> Result<Value, serde_json::Error> {
    let object: Map<String, Value> = serde_json::from_slice(body)?;
    Ok(Value::Object(object))
}

fn normalize(delivery_id: Option<String>, payload: Value, clock: &dyn Clock) -> NewWebhookEvent {
    let event_type = payload
        .get("action")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_EVENT_TYPE)
        .to_string();

    NewWebhookEvent {
        delivery_id: delivery_id.unwrap_or_else(|| UNKNOWN_DELIVERY.to_string()),
        event_type,
        timestamp: clock.now().to_rfc3339_opts(SecondsFormat::Micros, true),
        payload,
    }
}
