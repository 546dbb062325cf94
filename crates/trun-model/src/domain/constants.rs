/// Condition type that marks a run as finished once its status leaves `Unknown`.
pub const CONDITION_SUCCEEDED: &str = "Succeeded";

/// Kind of the aggregate run that owns child runs.
///
/// Runs owned by such a parent are cleaned up with the parent, never on their own.
pub const PARENT_RUN_KIND: &str = "PipelineRun";
