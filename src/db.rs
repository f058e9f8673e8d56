use std::time::Duration;

use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

use crate::store::StoreError;

pub async fn init_db(database_url: &str) -> Result<MySqlPool, sqlx::Error> {
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    info!("Database pool ready");
    Ok(pool)
}

/// Create or upgrade the schema. Safe to run on every start.
pub async fn run_migrations(pool: &MySqlPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Migrations applied");
    Ok(())
}
