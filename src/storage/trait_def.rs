use crate::models::{EventRecord, RawMetricEvent, SponsorRecord};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("brand id must not be empty")]
    EmptyBrand,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Initialize the storage (create tables, etc.)
    async fn init(&self) -> Result<()>;

    /// Append raw metric events to the log for a brand.
    /// Registers the brand if it has not been seen before.
    async fn append_events(&self, brand_id: &str, events: &[RawMetricEvent])
        -> StorageResult<u64>;

    /// Fetch every logged metric event for a brand, in no particular order
    async fn fetch_records(&self, brand_id: &str) -> Result<Vec<RawMetricEvent>>;

    /// Whether the brand is known
    async fn brand_exists(&self, brand_id: &str) -> Result<bool>;

    /// Create or rename a brand
    async fn upsert_brand(&self, brand_id: &str, name: &str) -> StorageResult<()>;

    /// Create or replace an event registry entry
    async fn upsert_event(
        &self,
        brand_id: &str,
        event_id: &str,
        name: &str,
        sponsors_json: Option<&str>,
    ) -> StorageResult<()>;

    /// Create or replace a sponsor registry entry
    async fn upsert_sponsor(&self, brand_id: &str, sponsor_id: &str, name: &str)
        -> StorageResult<()>;

    /// Event registry entries for a brand
    async fn lookup_events(&self, brand_id: &str) -> Result<Vec<EventRecord>>;

    /// Sponsor registry entries for a brand
    async fn lookup_sponsors(&self, brand_id: &str) -> Result<Vec<SponsorRecord>>;
}
