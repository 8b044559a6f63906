pub mod pipeline;

pub use pipeline::{
    ExecutionPipeline, PipelineEvent, PipelineOutcome, PipelineTask, TaskStatus,
    DEFAULT_SUMMARY,
};
