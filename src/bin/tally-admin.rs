use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tally::analytics::{AnalyticsService, Envelope, SharedAnalyticsRequest};
use tally::config::{Config, DatabaseBackend};
use tally::models::RawMetricEvent;
use tally::storage::{PostgresStorage, SqliteStorage, Storage};

#[derive(Parser)]
#[command(name = "tally-admin")]
#[command(about = "Tally analytics management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a brand or rename it
    RegisterBrand {
        brand_id: String,
        name: String,
    },
    /// Register an event in the event registry
    RegisterEvent {
        brand_id: String,
        event_id: String,
        name: String,
        /// Embedded sponsor list, e.g. '[{"id":"S1","name":"Acme"}]'
        #[arg(long)]
        sponsors_json: Option<String>,
    },
    /// Register a sponsor in the sponsor registry
    RegisterSponsor {
        brand_id: String,
        sponsor_id: String,
        name: String,
    },
    /// Append metric events from a JSON array file to a brand's log
    Import {
        brand_id: String,
        file: PathBuf,
    },
    /// Print the analytics view for a brand
    Report {
        brand_id: String,
        #[arg(long)]
        event: Option<String>,
        #[arg(long)]
        sponsor: Option<String>,
        /// Build the sponsor-scoped view (requires --sponsor)
        #[arg(long)]
        sponsor_view: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database.backend {
        DatabaseBackend::Sqlite => Arc::new(
            SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
        DatabaseBackend::Postgres => Arc::new(
            PostgresStorage::new(&config.database.url, config.database.max_connections).await?,
        ),
    };

    // Ensure database is initialized
    storage.init().await?;

    match cli.command {
        Commands::RegisterBrand { brand_id, name } => {
            storage.upsert_brand(&brand_id, &name).await?;
            println!("✓ Registered brand '{}' ({})", brand_id, name);
        }
        Commands::RegisterEvent {
            brand_id,
            event_id,
            name,
            sponsors_json,
        } => {
            if let Some(raw) = sponsors_json.as_deref() {
                serde_json::from_str::<Vec<tally::models::EmbeddedSponsor>>(raw)
                    .context("--sponsors-json must be a JSON array of {id, name} objects")?;
            }
            storage
                .upsert_event(&brand_id, &event_id, &name, sponsors_json.as_deref())
                .await?;
            println!("✓ Registered event '{}' for brand '{}'", event_id, brand_id);
        }
        Commands::RegisterSponsor {
            brand_id,
            sponsor_id,
            name,
        } => {
            storage.upsert_sponsor(&brand_id, &sponsor_id, &name).await?;
            println!("✓ Registered sponsor '{}' for brand '{}'", sponsor_id, brand_id);
        }
        Commands::Import { brand_id, file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read {}", file.display()))?;
            let events: Vec<RawMetricEvent> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of metric events", file.display()))?;
            let appended = storage.append_events(&brand_id, &events).await?;
            println!("✓ Appended {} metric events to brand '{}'", appended, brand_id);
        }
        Commands::Report {
            brand_id,
            event,
            sponsor,
            sponsor_view,
        } => {
            let analytics = AnalyticsService::new(Arc::clone(&storage), config.analytics.clone());
            let request = SharedAnalyticsRequest {
                brand_id: Some(brand_id),
                event_id: event,
                sponsor_id: sponsor,
                is_sponsor_view: Some(sponsor_view),
            };

            let envelope = Envelope::from(analytics.get_shared_analytics(&request).await);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
    }

    Ok(())
}
