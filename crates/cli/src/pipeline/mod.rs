//! Pipeline orchestration module.

mod orchestrator;
mod stats;
mod traffic;

pub use orchestrator::{build_registry, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
