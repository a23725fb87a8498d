use deadpool_redis::Runtime;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{api::error, ENV};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(&ENV.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database connected and migrations applied");

    Ok(pool)
}

pub fn connect_redis() -> Result<deadpool_redis::Pool, error::SystemError> {
    let mut cfg = deadpool_redis::Config::from_url(&ENV.redis_url);
    cfg.pool = Some(deadpool_redis::PoolConfig { max_size: 16, ..Default::default() });
    let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
    Ok(pool)
}

pub fn init_tracing() {
    let level = ENV.log_level.parse::<tracing::Level>().unwrap_or(tracing::Level::INFO);

    // The fmt subscriber also installs the `log` bridge, so actix's Logger lands here too.
    if let Err(e) = tracing_subscriber::fmt().with_max_level(level).with_target(true).try_init() {
        eprintln!("Tracing subscriber already initialised: {e}");
    }
}
