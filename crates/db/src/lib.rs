//! Document store access for the bootstrap: a MongoDB client factory, an
//! in-memory store for tests, and the trait both implement.

use std::time::Duration;

pub mod error;
pub mod memory;
pub mod model;
pub mod mongo;
pub mod store;

pub use error::{DbError, DbResult};
pub use memory::MemoryStore;
pub use model::{Account, AccountInfo, IndexInfo, IndexKind, IndexSpec, RoleGrant};
pub use mongo::MongoStore;
pub use store::{Database, DocumentStore};

/// Re-export so callers build documents with the same BSON version.
pub use mongodb::bson;

/// Ping `store` until it answers, sleeping `delay` between attempts.
///
/// This only gates startup. Operations issued afterwards are never retried.
pub async fn wait_until_ready(
    store: &dyn DocumentStore,
    attempts: u32,
    delay: Duration,
) -> DbResult<()> {
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match store.ping().await {
            Ok(()) => {
                tracing::info!(target: "seedbed-db", attempt, "database reachable");
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(
                    target: "seedbed-db",
                    attempt,
                    attempts,
                    error = %err,
                    "database not reachable yet"
                );
                last_error = err.to_string();
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Err(DbError::Unavailable {
        attempts,
        message: last_error,
    })
}
