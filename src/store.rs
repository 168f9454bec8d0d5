use crate::error::StoreError;
use crate::types::{NewWebhookEvent, WebhookEvent};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where and how to open the event database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("webhooks.db"),
            max_connections: 5,
        }
    }
}

/// Append-only log of received webhook events backed by SQLite.
///
/// Cloning is cheap; clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct EventStore {
    pool: SqlitePool,
}

impl EventStore {
    /// Open (creating if missing) the database file named in `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(&config.db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` is its own database, so the pool
    /// is pinned to one connection that is never recycled.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Create the events table and its indexes if they do not exist yet.
    ///
    /// Safe to call on an already initialized database; existing rows are
    /// left untouched.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS webhook_events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                delivery_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_delivery_id ON webhook_events(delivery_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_timestamp ON webhook_events(timestamp)")
            .execute(&self.pool)
            .await?;

        tracing::debug!("webhook_events schema ready");
        Ok(())
    }

    /// Append one event and return its storage-assigned id.
    ///
    /// The insert is a single statement; SQLite serializes writers, so
    /// concurrent callers always receive distinct, increasing ids.
    pub async fn insert(&self, event: &NewWebhookEvent) -> Result<i64, StoreError> {
        let payload = serde_json::to_string(&event.payload).map_err(StoreError::Serialize)?;

        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (delivery_id, event_type, timestamp, payload)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&event.delivery_id)
        .bind(&event.event_type)
        .bind(&event.timestamp)
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Up to `limit` events, most recently inserted first.
    pub async fn list_recent(&self, limit: u32) -> Result<Vec<WebhookEvent>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, delivery_id, event_type, timestamp, payload, created_at
            FROM webhook_events
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(map_event_row).collect()
    }

    pub async fn get(&self, id: i64) -> Result<Option<WebhookEvent>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, delivery_id, event_type, timestamp, payload, created_at
            FROM webhook_events
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(map_event_row).transpose()
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM webhook_events")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Round-trip a trivial query to confirm the database is reachable.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn map_event_row(row: SqliteRow) -> Result<WebhookEvent, StoreError> {
    let id: i64 = row.try_get("id")?;
    let raw_payload: String = row.try_get("payload")?;
    let payload = serde_json::from_str(&raw_payload)
        .map_err(|source| StoreError::CorruptPayload { id, source })?;

    Ok(WebhookEvent {
        id,
        delivery_id: row.try_get("delivery_id")?,
        event_type: row.try_get("event_type")?,
        timestamp: row.try_get("timestamp")?,
        payload,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(delivery_id: &str) -> NewWebhookEvent {
        NewWebhookEvent {
            delivery_id: delivery_id.to_string(),
            event_type: "opened".to_string(),
            timestamp: "2024-01-01T00:00:00+00:00".to_string(),
            payload: json!({ "action": "opened", "number": 1 }),
        }
    }

    async fn store() -> EventStore {
        let store = EventStore::in_memory().await.unwrap();
        store.bootstrap().await.unwrap();
        store
    }

    #[tokio::test]
    async fn insert_then_get_round_trips_fields() {
        let store = store().await;
        let id = store.insert(&event("abc")).await.unwrap();

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.delivery_id, "abc");
        assert_eq!(stored.event_type, "opened");
        assert_eq!(stored.timestamp, "2024-01-01T00:00:00+00:00");
        assert_eq!(stored.payload, json!({ "action": "opened", "number": 1 }));
        assert!(stored.created_at.is_some());
    }

    #[tokio::test]
    async fn get_missing_returns_none() {
        let store = store().await;
        assert!(store.get(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ids_increase_with_each_insert() {
        let store = store().await;
        let first = store.insert(&event("a")).await.unwrap();
        let second = store.insert(&event("b")).await.unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn insert_without_bootstrap_fails() {
        let store = EventStore::in_memory().await.unwrap();
        let err = store.insert(&event("a")).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[tokio::test]
    async fn corrupt_payload_is_reported() {
        let store = store().await;
        sqlx::query(
            "INSERT INTO webhook_events (delivery_id, event_type, timestamp, payload) VALUES ('x', 'y', 'z', '{oops')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let err = store.list_recent(10).await.unwrap_err();
        assert!(matches!(err, StoreError::CorruptPayload { .. }));
    }
}
