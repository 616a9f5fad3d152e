use std::sync::Arc;

use anyhow::Context;

use crate::config::Config;
use crate::services::attempt_service::AttemptService;
use crate::store::mongo::MongoStore;

pub mod attempt_service;

/// Wire an [`AttemptService`] to MongoDB per the loaded configuration,
/// ensuring the indexes the store's atomicity guarantees depend on.
pub async fn connect(config: &Config) -> anyhow::Result<AttemptService> {
    let client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .context("Failed to connect to MongoDB")?;
    let db = client.database(&config.mongo_database);

    let store = Arc::new(MongoStore::new(db));
    store.ensure_indexes().await?;

    tracing::info!(
        "Attempt service connected: database={}",
        config.mongo_database
    );

    Ok(AttemptService::new(store.clone(), store)
        .with_attempt_limit(config.max_attempts_per_exam))
}
