//! PostgreSQL pool and migration helpers shared by the persistent repositories

use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::error::Result;

/// Open a connection pool against `database_url`
pub async fn init_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    info!("Connected to PostgreSQL database (pool size {})", max_connections);
    Ok(pool)
}

/// Run the workspace migrations (`<workspace>/migrations`) on the database
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let manifest_dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    let migrations_path = manifest_dir
        .parent()
        .unwrap_or(manifest_dir)
        .join("migrations");

    sqlx::migrate::Migrator::new(migrations_path)
        .await?
        .run(pool)
        .await?;

    info!("Database migrations applied");
    Ok(())
}
