use crate::models::{EventRecord, MetricEventRow, RawMetricEvent, SponsorRecord};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteStorage {
    pool: Arc<SqlitePool>,
}

impl SqliteStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

fn unix_now() -> Result<i64> {
    Ok(std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs() as i64)
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS brands (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                brand_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                sponsors_json TEXT,
                PRIMARY KEY (brand_id, id)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sponsors (
                brand_id TEXT NOT NULL,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (brand_id, id)
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        // Append-only metric log
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metric_events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                brand_id TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                event_id TEXT,
                surface TEXT NOT NULL,
                metric TEXT NOT NULL,
                sponsor_id TEXT,
                value REAL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_metric_events_brand ON metric_events(brand_id)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn append_events(
        &self,
        brand_id: &str,
        events: &[RawMetricEvent],
    ) -> StorageResult<u64> {
        if brand_id.trim().is_empty() {
            return Err(StorageError::EmptyBrand);
        }

        let now = unix_now()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO brands (id, name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(brand_id)
        .bind(brand_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        let mut appended = 0;
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO metric_events (brand_id, timestamp, event_id, surface, metric, sponsor_id, value)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(brand_id)
            .bind(event.timestamp)
            .bind(event.event_id.as_deref())
            .bind(event.surface.as_str())
            .bind(event.metric.as_str())
            .bind(event.sponsor_id.as_deref())
            .bind(event.value)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Other(e.into()))?;
            appended += 1;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Ok(appended)
    }

    async fn fetch_records(&self, brand_id: &str) -> Result<Vec<RawMetricEvent>> {
        let rows = sqlx::query_as::<_, MetricEventRow>(
            r#"
            SELECT timestamp, event_id, surface, metric, sponsor_id, value
            FROM metric_events
            WHERE brand_id = ?
            ORDER BY seq
            "#,
        )
        .bind(brand_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(RawMetricEvent::from).collect())
    }

    async fn brand_exists(&self, brand_id: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM brands WHERE id = ?")
            .bind(brand_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        Ok(count > 0)
    }

    async fn upsert_brand(&self, brand_id: &str, name: &str) -> StorageResult<()> {
        if brand_id.trim().is_empty() {
            return Err(StorageError::EmptyBrand);
        }

        let now = unix_now()?;
        sqlx::query(
            r#"
            INSERT INTO brands (id, name, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(brand_id)
        .bind(name)
        .bind(now)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(())
    }

    async fn upsert_event(
        &self,
        brand_id: &str,
        event_id: &str,
        name: &str,
        sponsors_json: Option<&str>,
    ) -> StorageResult<()> {
        if brand_id.trim().is_empty() {
            return Err(StorageError::EmptyBrand);
        }

        sqlx::query(
            r#"
            INSERT INTO events (brand_id, id, name, sponsors_json)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(brand_id, id) DO UPDATE SET
                name = excluded.name,
                sponsors_json = excluded.sponsors_json
            "#,
        )
        .bind(brand_id)
        .bind(event_id)
        .bind(name)
        .bind(sponsors_json)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(())
    }

    async fn upsert_sponsor(
        &self,
        brand_id: &str,
        sponsor_id: &str,
        name: &str,
    ) -> StorageResult<()> {
        if brand_id.trim().is_empty() {
            return Err(StorageError::EmptyBrand);
        }

        sqlx::query(
            r#"
            INSERT INTO sponsors (brand_id, id, name)
            VALUES (?, ?, ?)
            ON CONFLICT(brand_id, id) DO UPDATE SET name = excluded.name
            "#,
        )
        .bind(brand_id)
        .bind(sponsor_id)
        .bind(name)
        .execute(self.pool.as_ref())
        .await
        .map_err(|e| StorageError::Other(e.into()))?;

        Ok(())
    }

    async fn lookup_events(&self, brand_id: &str) -> Result<Vec<EventRecord>> {
        let events = sqlx::query_as::<_, EventRecord>(
            r#"
            SELECT id, brand_id, name, sponsors_json
            FROM events
            WHERE brand_id = ?
            ORDER BY id
            "#,
        )
        .bind(brand_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(events)
    }

    async fn lookup_sponsors(&self, brand_id: &str) -> Result<Vec<SponsorRecord>> {
        let sponsors = sqlx::query_as::<_, SponsorRecord>(
            r#"
            SELECT id, brand_id, name
            FROM sponsors
            WHERE brand_id = ?
            ORDER BY id
            "#,
        )
        .bind(brand_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(sponsors)
    }
}
