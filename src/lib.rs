//! Seedbed application library
//!
//! Provisions accounts and loads fixture data into a fresh MongoDB instance.

pub mod modules;
pub mod verify;

use anyhow::Context;
use seedbed_db::{wait_until_ready, DocumentStore, MongoStore};
use seedbed_kernel::{RunCtx, Settings, StageRegistry};

/// Registry holding the account and fixture stages, in run order
pub fn registry() -> StageRegistry {
    let mut registry = StageRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Build a client from settings and wait until the server answers
pub async fn connect(settings: &Settings) -> anyhow::Result<MongoStore> {
    let store = MongoStore::connect(&settings.database.uri, &settings.database.app_name)
        .await
        .with_context(|| "failed to create MongoDB client")?;

    wait_until_ready(
        &store,
        settings.database.connect_retries,
        settings.database.retry_delay(),
    )
    .await
    .with_context(|| "MongoDB did not become reachable")?;

    Ok(store)
}

/// Run every stage against `store`; the first failure ends the run
pub async fn bootstrap(store: &dyn DocumentStore) -> anyhow::Result<()> {
    let ctx = RunCtx::new(store);
    registry().run_all(&ctx).await
}
