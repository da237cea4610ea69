/// Alignment stage, used for progress reporting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignmentStage {
    ResolvingReference,
    Registering,
    Accumulating,
}

impl std::fmt::Display for AlignmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ResolvingReference => write!(f, "Resolving reference"),
            Self::Registering => write!(f, "Registering frames"),
            Self::Accumulating => write!(f, "Accumulating offsets"),
        }
    }
}

/// Thread-safe progress reporting and cancellation for an alignment run.
///
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new stage has started. `total_items` is the number of work items in
    /// this stage (e.g., frame count), if known.
    fn begin_stage(&self, _stage: AlignmentStage, _total_items: Option<usize>) {}

    /// `items_done` work items of the current stage have completed.
    fn advance(&self, _items_done: usize) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}

    /// Polled before every frame; returning true aborts the run with
    /// `StackRegError::Cancelled`.
    fn is_cancelled(&self) -> bool {
        false
    }
}

pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}
