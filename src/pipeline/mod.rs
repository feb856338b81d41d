pub mod orchestrator;
pub mod report;

pub use orchestrator::{Pipeline, PipelineError};
pub use report::{RunOutcome, RunReport};
