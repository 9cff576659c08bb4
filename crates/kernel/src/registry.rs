use anyhow::{anyhow, Context};
use std::sync::Arc;

use crate::stage::{RunCtx, Stage, Step};

/// Ordered list of bootstrap stages
pub struct StageRegistry {
    stages: Vec<Arc<dyn Stage>>,
}

impl StageRegistry {
    /// Create a new stage registry
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage; it runs after every stage registered before it
    pub fn register(&mut self, stage: Arc<dyn Stage>) {
        self.stages.push(stage);
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> Option<&Arc<dyn Stage>> {
        self.stages.iter().find(|stage| stage.name() == name)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Every planned step, tagged with its stage, in execution order
    pub fn plan(&self) -> Vec<(&'static str, Step)> {
        self.stages
            .iter()
            .flat_map(|stage| stage.steps().into_iter().map(move |step| (stage.name(), step)))
            .collect()
    }

    /// Run all stages in order, stopping at the first failure
    pub async fn run_all(&self, ctx: &RunCtx<'_>) -> anyhow::Result<()> {
        let names: Vec<&str> = self.stages.iter().map(|stage| stage.name()).collect();
        tracing::info!("running stages in order: {:?}", names);

        for stage in &self.stages {
            Self::run_stage(stage, ctx).await?;
        }

        tracing::info!("all stages completed");
        Ok(())
    }

    /// Run a single stage by name
    pub async fn run_one(&self, name: &str, ctx: &RunCtx<'_>) -> anyhow::Result<()> {
        let stage = self
            .get_stage(name)
            .ok_or_else(|| anyhow!("unknown stage '{}'", name))?;
        Self::run_stage(stage, ctx).await
    }

    async fn run_stage(stage: &Arc<dyn Stage>, ctx: &RunCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(stage = stage.name(), "starting stage");

        stage
            .run(ctx)
            .await
            .with_context(|| format!("stage '{}' failed", stage.name()))?;

        tracing::info!(stage = stage.name(), "stage completed");
        Ok(())
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedbed_db::MemoryStore;
    use std::sync::Mutex;

    struct RecordingStage {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait::async_trait]
    impl Stage for RecordingStage {
        fn name(&self) -> &'static str {
            self.name
        }

        fn steps(&self) -> Vec<Step> {
            vec![Step::new("myapp", format!("{} step", self.name))]
        }

        async fn run(&self, _ctx: &RunCtx<'_>) -> anyhow::Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(())
        }
    }

    fn registry(fail_first: bool, log: &Arc<Mutex<Vec<&'static str>>>) -> StageRegistry {
        let mut registry = StageRegistry::new();
        registry.register(Arc::new(RecordingStage {
            name: "first",
            fail: fail_first,
            log: Arc::clone(log),
        }));
        registry.register(Arc::new(RecordingStage {
            name: "second",
            fail: false,
            log: Arc::clone(log),
        }));
        registry
    }

    #[test]
    fn test_registry_creation() {
        let registry = StageRegistry::new();
        assert_eq!(registry.stage_count(), 0);
        assert!(registry.plan().is_empty());
    }

    #[test]
    fn test_plan_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let plan = registry(false, &log).plan();
        let stages: Vec<&str> = plan.iter().map(|(stage, _)| *stage).collect();
        assert_eq!(stages, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = MemoryStore::new();
        let ctx = RunCtx::new(&store);

        registry(false, &log).run_all(&ctx).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_first_failure_stops_the_run() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = MemoryStore::new();
        let ctx = RunCtx::new(&store);

        let err = registry(true, &log).run_all(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "stage 'first' failed");
        assert_eq!(*log.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_unknown_stage_is_an_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let store = MemoryStore::new();
        let ctx = RunCtx::new(&store);

        let err = registry(false, &log)
            .run_one("third", &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown stage 'third'");
    }
}
