//! Webhook receiver: verifies `X-Hub-Signature-256` HMAC signatures over the
//! raw request body and appends accepted deliveries to a SQLite event log.

pub mod clock;
pub mod config;
pub mod error;
pub mod http_server;
pub mod ingest;
pub mod logging;
pub mod store;
pub mod types;
pub mod verification;

pub use config::Config;
pub use error::{IngestError, StoreError};
pub use http_server::{create_router, AppState};
pub use ingest::{IngestReceipt, IngestRequest, Ingestor};
pub use store::{EventStore, StoreConfig};
pub use types::{NewWebhookEvent, WebhookEvent};
pub use verification::Verifier;
