//! Process configuration, read once at startup from flags and environment.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::store::StoreConfig;
use crate::verification::Verifier;

/// Placeholder secret used when `WEBHOOK_SECRET` is not set. Never deploy with it.
pub const DEFAULT_SECRET: &str = "default-secret-change-me";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable multi-field lines.
    Pretty,
}

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Shared secret used to verify `X-Hub-Signature-256` HMAC signatures.
    #[arg(long, env = "WEBHOOK_SECRET", default_value = DEFAULT_SECRET, hide_default_value = true)]
    pub webhook_secret: String,

    /// Path of the SQLite database holding received events.
    #[arg(long, env = "DB_PATH", default_value = "webhooks.db")]
    pub db_path: PathBuf,

    /// Maximum number of pooled database connections.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Reject deliveries that carry no signature header.
    #[arg(long, env = "REQUIRE_SIGNATURE")]
    pub require_signature: bool,

    /// Interface to bind the HTTP server to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to.
    #[arg(short, long, env = "PORT", default_value_t = 8000)]
    pub port: u16,

    /// Log output format.
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("webhook_secret", &"<redacted>")
            .field("db_path", &self.db_path)
            .field("max_connections", &self.max_connections)
            .field("require_signature", &self.require_signature)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Config {
    pub fn verifier(&self) -> Verifier {
        Verifier::new(&self.webhook_secret)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            db_path: self.db_path.clone(),
            max_connections: self.max_connections,
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.webhook_secret == DEFAULT_SECRET
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        use anyhow::Context;

        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }
}
