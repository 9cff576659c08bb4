//! Settings, stage contract, and the ordered stage registry.

pub mod registry;
pub mod settings;
pub mod stage;

pub use registry::StageRegistry;
pub use settings::Settings;
pub use stage::{RunCtx, Stage, Step};
