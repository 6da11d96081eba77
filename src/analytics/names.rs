//! Display-name resolution for events and sponsors
//!
//! Names come from an ordered list of sources. The first source that knows
//! a name for an id wins and later sources never overwrite it. A source that
//! fails is skipped with a warning, so resolution degrades to whatever the
//! remaining sources provide and, at worst, to the raw ids.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::models::EmbeddedSponsor;
use crate::storage::Storage;

/// A lookup strategy yielding `(id, name)` pairs for a brand
#[async_trait]
pub trait NameSource: Send + Sync {
    fn source_name(&self) -> &'static str;

    async fn names(&self, brand_id: &str) -> Result<Vec<(String, String)>>;
}

/// Event names from the event registry
pub struct EventRegistrySource {
    storage: Arc<dyn Storage>,
}

impl EventRegistrySource {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl NameSource for EventRegistrySource {
    fn source_name(&self) -> &'static str {
        "event_registry"
    }

    async fn names(&self, brand_id: &str) -> Result<Vec<(String, String)>> {
        let events = self.storage.lookup_events(brand_id).await?;
        Ok(events.into_iter().map(|e| (e.id, e.name)).collect())
    }
}

/// Sponsor names from the dedicated sponsor registry
pub struct SponsorRegistrySource {
    storage: Arc<dyn Storage>,
}

impl SponsorRegistrySource {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl NameSource for SponsorRegistrySource {
    fn source_name(&self) -> &'static str {
        "sponsor_registry"
    }

    async fn names(&self, brand_id: &str) -> Result<Vec<(String, String)>> {
        let sponsors = self.storage.lookup_sponsors(brand_id).await?;
        Ok(sponsors.into_iter().map(|s| (s.id, s.name)).collect())
    }
}

/// Sponsor names embedded in event payloads
pub struct EmbeddedSponsorSource {
    storage: Arc<dyn Storage>,
}

impl EmbeddedSponsorSource {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl NameSource for EmbeddedSponsorSource {
    fn source_name(&self) -> &'static str {
        "event_embedded_sponsors"
    }

    async fn names(&self, brand_id: &str) -> Result<Vec<(String, String)>> {
        let events = self.storage.lookup_events(brand_id).await?;

        let mut names = Vec::new();
        for event in events {
            let Some(raw) = event.sponsors_json.as_deref() else {
                continue;
            };

            match serde_json::from_str::<Vec<EmbeddedSponsor>>(raw) {
                Ok(sponsors) => names.extend(
                    sponsors
                        .into_iter()
                        .filter_map(|s| s.name.map(|name| (s.id, name))),
                ),
                Err(e) => {
                    warn!(
                        brand_id,
                        event_id = %event.id,
                        error = %e,
                        "skipping malformed embedded sponsor list"
                    );
                }
            }
        }

        Ok(names)
    }
}

/// Resolved names for one brand
#[derive(Debug, Clone, Default)]
pub struct ResolvedNames {
    pub events: HashMap<String, String>,
    pub sponsors: HashMap<String, String>,
}

impl ResolvedNames {
    /// Event display name, falling back to the id
    pub fn event_name<'a>(&'a self, event_id: &'a str) -> &'a str {
        self.events.get(event_id).map(String::as_str).unwrap_or(event_id)
    }

    /// Sponsor display name, falling back to the id
    pub fn sponsor_name<'a>(&'a self, sponsor_id: &'a str) -> &'a str {
        self.sponsors
            .get(sponsor_id)
            .map(String::as_str)
            .unwrap_or(sponsor_id)
    }
}

/// Prioritized name lookup for events and sponsors
pub struct NameResolver {
    event_sources: Vec<Box<dyn NameSource>>,
    sponsor_sources: Vec<Box<dyn NameSource>>,
}

impl NameResolver {
    /// Storage-backed resolver: sponsors resolve from the registry first,
    /// then from sponsor lists embedded in events.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            event_sources: vec![Box::new(EventRegistrySource::new(Arc::clone(&storage)))],
            sponsor_sources: vec![
                Box::new(SponsorRegistrySource::new(Arc::clone(&storage))),
                Box::new(EmbeddedSponsorSource::new(storage)),
            ],
        }
    }

    pub fn with_sources(
        event_sources: Vec<Box<dyn NameSource>>,
        sponsor_sources: Vec<Box<dyn NameSource>>,
    ) -> Self {
        Self {
            event_sources,
            sponsor_sources,
        }
    }

    pub async fn resolve_event_names(&self, brand_id: &str) -> HashMap<String, String> {
        first_match_wins(&self.event_sources, brand_id).await
    }

    pub async fn resolve_sponsor_names(&self, brand_id: &str) -> HashMap<String, String> {
        first_match_wins(&self.sponsor_sources, brand_id).await
    }

    pub async fn resolve(&self, brand_id: &str) -> ResolvedNames {
        ResolvedNames {
            events: self.resolve_event_names(brand_id).await,
            sponsors: self.resolve_sponsor_names(brand_id).await,
        }
    }
}

async fn first_match_wins(
    sources: &[Box<dyn NameSource>],
    brand_id: &str,
) -> HashMap<String, String> {
    let mut resolved = HashMap::new();

    for source in sources {
        match source.names(brand_id).await {
            Ok(entries) => {
                let before = resolved.len();
                for (id, name) in entries {
                    if id.trim().is_empty() || name.trim().is_empty() {
                        continue;
                    }
                    resolved.entry(id).or_insert(name);
                }
                debug!(
                    brand_id,
                    source = source.source_name(),
                    added = resolved.len() - before,
                    "resolved names"
                );
            }
            Err(e) => {
                warn!(
                    brand_id,
                    source = source.source_name(),
                    error = %e,
                    "name source unavailable, falling back to ids"
                );
            }
        }
    }

    resolved
}
