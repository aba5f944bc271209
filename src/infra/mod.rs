use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway_signer;
pub mod notification_dispatcher;
pub mod rate_limit;
pub mod setup;

pub use error::InfraError;
pub use rate_limit::{RateLimiterTrait, RedisRateLimiter};

pub async fn postgres_persistence(database_url: &str) -> Result<PostgresPersistence, InfraError> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
