pub mod models;
pub mod postgres;
pub mod schema;
pub mod sqlite;
pub mod storage;

pub use models::{CompactBucket, RawValue, Sample};
pub use postgres::PostgresManager;
pub use sqlite::SqliteManager;
pub use storage::ValueStorage;

use crate::config::Settings;
use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tracing::info;

/// Open the storage engine named by the configured database URL.
pub async fn connect(settings: &Settings) -> Result<Arc<dyn ValueStorage>> {
    let url = settings.database_url()?;
    let max_connections = settings.database.max_connections;

    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        let pg = PostgresManager::connect(&url, max_connections)
            .await
            .context("Failed to create PostgreSQL connection pool")?;
        info!("Connected to PostgreSQL");
        Ok(Arc::new(pg))
    } else if url.starts_with("sqlite:") {
        let sqlite = SqliteManager::connect(&url, max_connections)
            .await
            .context("Failed to open SQLite database")?;
        info!("Opened SQLite database {}", url);
        Ok(Arc::new(sqlite))
    } else {
        bail!("Unsupported database URL scheme: {}", url)
    }
}
