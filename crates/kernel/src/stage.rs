use async_trait::async_trait;
use seedbed_db::bson::DateTime;
use seedbed_db::{Database, DocumentStore};

/// Context handed to every stage of a run
pub struct RunCtx<'a> {
    pub store: &'a dyn DocumentStore,
    /// Timestamp stamped on every document written during the run
    pub now: DateTime,
}

impl<'a> RunCtx<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            now: DateTime::now(),
        }
    }

    /// Explicit handle to a logical database
    pub fn database(&self, name: &str) -> Database<'a> {
        Database::new(self.store, name)
    }
}

/// One planned statement of a stage, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub database: &'static str,
    pub action: String,
}

impl Step {
    pub fn new(database: &'static str, action: impl Into<String>) -> Self {
        Self {
            database,
            action: action.into(),
        }
    }
}

/// A bootstrap stage. Stages run once, in registration order.
#[async_trait]
pub trait Stage: Sync + Send {
    /// Unique name for this stage
    fn name(&self) -> &'static str;

    /// The statements this stage issues, without touching the database
    fn steps(&self) -> Vec<Step>;

    /// Execute every step in order; the first error aborts the stage
    async fn run(&self, ctx: &RunCtx<'_>) -> anyhow::Result<()>;
}
