pub mod aggregate;
pub mod competitors;
pub mod fetcher;
pub mod metadata;
pub mod pipeline;
pub mod recommend;
pub mod render;
pub mod sources;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use pipeline::{
    InsightPipeline, PipelineDeps, PipelineOptions, RunOutcome, RunRequest, RunStats, Stage,
};
