pub mod accounts;
pub mod fixtures;

use std::sync::Arc;

use seedbed_kernel::StageRegistry;

/// Application database holding users, products and orders
pub const PRIMARY_DB: &str = "myapp";
/// Separate database used for connectivity checks
pub const TEST_DB: &str = "testdb";

/// Register the bootstrap stages in execution order
pub fn register_all(registry: &mut StageRegistry) {
    registry.register(Arc::new(accounts::AccountsStage::new()));
    registry.register(Arc::new(fixtures::FixturesStage::new()));
}
