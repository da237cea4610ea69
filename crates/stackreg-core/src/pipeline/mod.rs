pub mod config;
mod accumulate;
mod orchestrator;
mod trials;
mod types;

pub use accumulate::accumulate_offsets;
pub use config::{AlignmentConfig, AlignmentOptions, EdgeExtension, ReferenceSpec, TrialRange};
pub use orchestrator::{compute_stack_alignment, compute_stack_alignment_reported};
pub use trials::{plan_blocks, BlockPlan};
pub use types::{AlignmentStage, ProgressReporter};
