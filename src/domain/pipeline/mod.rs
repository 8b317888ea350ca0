//! Reply pipeline - the state machine tying every component together

mod outcome;
mod runner;
mod state;

pub use outcome::{
    InputMessage, PipelineInput, PipelineOutcome, PipelineOutput, PipelineReport,
    PipelineRequest, PipelineResult,
};
pub use runner::Pipeline;
pub use state::PipelineState;
