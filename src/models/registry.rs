use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Event as stored in the event registry.
///
/// `sponsors_json` carries the sponsor list embedded in the event payload,
/// a JSON array of `{"id": .., "name": ..}` objects.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    pub id: String,
    pub brand_id: String,
    pub name: String,
    pub sponsors_json: Option<String>,
}

/// Sponsor as stored in the dedicated sponsor registry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SponsorRecord {
    pub id: String,
    pub brand_id: String,
    pub name: String,
}

/// Sponsor entry embedded inside an event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddedSponsor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}
