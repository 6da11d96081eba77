use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::analytics::view::{DEFAULT_TOP_SPONSORS, DEFAULT_UNIQUE_ID_CAP, MAX_TOP_SPONSORS};

/// Longest accepted report cache lifetime (30 days)
pub const MAX_REPORT_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Number of leading records inspected when counting distinct event
    /// and sponsor ids for the summary
    pub unique_id_cap: usize,
    /// Length of the `topSponsors` highlight list
    pub top_sponsors: usize,
    /// Lifetime of memoized reports; 0 disables the report cache
    pub report_cache_ttl_secs: u64,
    pub report_cache_max_entries: u64,
}

impl AnalyticsConfig {
    const fn default_unique_id_cap() -> usize {
        DEFAULT_UNIQUE_ID_CAP
    }

    const fn default_top_sponsors() -> usize {
        DEFAULT_TOP_SPONSORS
    }

    const fn default_report_cache_max_entries() -> u64 {
        1_000
    }
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            unique_id_cap: Self::default_unique_id_cap(),
            top_sponsors: Self::default_top_sponsors(),
            report_cache_ttl_secs: 0,
            report_cache_max_entries: Self::default_report_cache_max_entries(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            "sqlite" => DatabaseBackend::Sqlite,
            other => {
                tracing::warn!(
                    "Unknown DATABASE_BACKEND '{other}', falling back to 'sqlite'. Supported values: sqlite, postgres"
                );
                DatabaseBackend::Sqlite
            }
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./tally.db?mode=rwc".to_string());

        let max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = std::env::var("API_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a valid port number")?;

        let unique_id_cap = std::env::var("ANALYTICS_UNIQUE_ID_CAP")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or_else(AnalyticsConfig::default_unique_id_cap);

        let top_sponsors = std::env::var("ANALYTICS_TOP_SPONSORS")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(cap_top_sponsors)
            .unwrap_or_else(AnalyticsConfig::default_top_sponsors);

        let report_cache_ttl_secs =
            parse_report_cache_ttl(std::env::var("REPORT_CACHE_TTL_SECS").ok().as_deref())?;

        let report_cache_max_entries = std::env::var("REPORT_CACHE_MAX_ENTRIES")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_else(AnalyticsConfig::default_report_cache_max_entries);

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            analytics: AnalyticsConfig {
                unique_id_cap,
                top_sponsors,
                report_cache_ttl_secs,
                report_cache_max_entries,
            },
        })
    }
}

fn cap_top_sponsors(n: usize) -> usize {
    if n > MAX_TOP_SPONSORS {
        tracing::warn!(
            "ANALYTICS_TOP_SPONSORS={n} exceeds the maximum of {MAX_TOP_SPONSORS}, using {MAX_TOP_SPONSORS}"
        );
    }
    n.min(MAX_TOP_SPONSORS)
}

fn parse_report_cache_ttl(raw: Option<&str>) -> anyhow::Result<u64> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(0);
    };

    let ttl = raw
        .parse::<u64>()
        .context("REPORT_CACHE_TTL_SECS must be a non-negative integer")?;
    anyhow::ensure!(
        ttl <= MAX_REPORT_CACHE_TTL_SECS,
        "REPORT_CACHE_TTL_SECS must be at most {MAX_REPORT_CACHE_TTL_SECS} seconds, got {ttl}"
    );

    Ok(ttl)
}
