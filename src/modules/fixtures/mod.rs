//! Sample documents and secondary indexes.
//!
//! Users are inserted before the unique email index is built, so the index
//! only guards documents written after this stage.

pub mod data;
pub mod models;

use anyhow::Context;
use async_trait::async_trait;
use seedbed_db::bson::{to_document, Document};
use seedbed_db::{Database, DbError};
use seedbed_kernel::{RunCtx, Stage, Step};
use serde::Serialize;

use super::{PRIMARY_DB, TEST_DB};
use data::{ORDERS, PRODUCTS, TEST_COLLECTION, USERS};

fn encode<T: Serialize>(records: &[T]) -> anyhow::Result<Vec<Document>> {
    records
        .iter()
        .map(|record| {
            to_document(record)
                .map_err(DbError::Encode)
                .context("failed to encode fixture record")
        })
        .collect()
}

async fn insert<T: Serialize>(db: &Database<'_>, collection: &str, records: &[T]) -> anyhow::Result<()> {
    let ids = db
        .insert_many(collection, encode(records)?)
        .await
        .with_context(|| format!("failed to insert into {}.{}", db.name(), collection))?;

    tracing::info!(
        database = db.name(),
        collection,
        inserted = ids.len(),
        "inserted sample {}",
        collection
    );
    Ok(())
}

pub struct FixturesStage;

impl FixturesStage {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for FixturesStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for FixturesStage {
    fn name(&self) -> &'static str {
        "fixtures"
    }

    fn steps(&self) -> Vec<Step> {
        let mut steps = vec![
            Step::new(PRIMARY_DB, format!("insert {USERS}")),
            Step::new(PRIMARY_DB, format!("insert {PRODUCTS}")),
            Step::new(PRIMARY_DB, format!("insert {ORDERS}")),
        ];
        steps.extend(data::indexes().into_iter().map(|(collection, spec)| {
            let unique = if spec.unique { " (unique)" } else { "" };
            Step::new(
                PRIMARY_DB,
                format!("create index {}.{}{}", collection, spec.default_name(), unique),
            )
        }));
        steps.push(Step::new(TEST_DB, format!("insert {TEST_COLLECTION}")));
        steps
    }

    async fn run(&self, ctx: &RunCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(stage = self.name(), "inserting sample data");

        let myapp = ctx.database(PRIMARY_DB);
        insert(&myapp, USERS, &data::users(ctx.now)).await?;
        insert(&myapp, PRODUCTS, &data::products(ctx.now)).await?;
        insert(&myapp, ORDERS, &data::orders(ctx.now)).await?;

        for (collection, spec) in data::indexes() {
            let name = myapp
                .create_index(collection, &spec)
                .await
                .with_context(|| {
                    format!(
                        "failed to create index {} on {}.{}",
                        spec.default_name(),
                        PRIMARY_DB,
                        collection
                    )
                })?;
            tracing::debug!(collection, index = %name, unique = spec.unique, "index created");
        }
        tracing::info!(database = PRIMARY_DB, "created indexes for collections");

        let testdb = myapp.sibling(TEST_DB);
        insert(&testdb, TEST_COLLECTION, &data::test_records(ctx.now)).await?;

        tracing::info!(stage = self.name(), "sample data insertion completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_db::bson::doc;
    use seedbed_db::MemoryStore;

    #[test]
    fn steps_switch_database_only_at_the_end() {
        let steps = FixturesStage::new().steps();
        assert_eq!(steps.len(), 11);
        assert!(steps[..10].iter().all(|step| step.database == PRIMARY_DB));
        assert_eq!(steps[10].database, TEST_DB);
        assert_eq!(steps[3].action, "create index users.email_1 (unique)");
    }

    #[tokio::test]
    async fn duplicate_email_already_present_stops_before_testdb() {
        let store = MemoryStore::new();
        let ctx = RunCtx::new(&store);
        ctx.database(PRIMARY_DB)
            .insert_many(USERS, vec![doc! { "email": "jane.smith@example.com" }])
            .await
            .unwrap();

        let err = FixturesStage::new().run(&ctx).await.unwrap_err();
        assert!(err.to_string().contains("email_1"));
        assert_eq!(ctx.database(PRIMARY_DB).count(USERS).await.unwrap(), 4);
        assert_eq!(ctx.database(TEST_DB).count(TEST_COLLECTION).await.unwrap(), 0);
    }
}
