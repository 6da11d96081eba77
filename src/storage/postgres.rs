use crate::models::{EventRecord, MetricEventRow, RawMetricEvent, SponsorRecord};
use crate::storage::{Storage, StorageError, StorageResult};
use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PostgresStorage {
    pool: Arc<PgPool>,
}

impl PostgresStorage {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS brands (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at BIGINT NOT NULL
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

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metric_events (
                seq BIGSERIAL PRIMARY KEY,
                brand_id TEXT NOT NULL,
                timestamp BIGINT NOT NULL,
                event_id TEXT,
                surface TEXT NOT NULL,
                metric TEXT NOT NULL,
                sponsor_id TEXT,
                value DOUBLE PRECISION
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

        let now = chrono::Utc::now().timestamp();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        sqlx::query(
            r#"
            INSERT INTO brands (id, name, created_at)
            VALUES ($1, $1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
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
                VALUES ($1, $2, $3, $4, $5, $6, $7)
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
            WHERE brand_id = $1
            ORDER BY seq
            "#,
        )
        .bind(brand_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(RawMetricEvent::from).collect())
    }

    async fn brand_exists(&self, brand_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM brands WHERE id = $1)",
        )
        .bind(brand_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(exists)
    }

    async fn upsert_brand(&self, brand_id: &str, name: &str) -> StorageResult<()> {
        if brand_id.trim().is_empty() {
            return Err(StorageError::EmptyBrand);
        }

        sqlx::query(
            r#"
            INSERT INTO brands (id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(brand_id)
        .bind(name)
        .bind(chrono::Utc::now().timestamp())
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
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (brand_id, id) DO UPDATE SET
                name = EXCLUDED.name,
                sponsors_json = EXCLUDED.sponsors_json
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
            VALUES ($1, $2, $3)
            ON CONFLICT (brand_id, id) DO UPDATE SET name = EXCLUDED.name
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
            WHERE brand_id = $1
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
            WHERE brand_id = $1
            ORDER BY id
            "#,
        )
        .bind(brand_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(sponsors)
    }
}
