use thiserror::Error;

/// Failure taxonomy for one pipeline run.
///
/// Tool unavailability during chart merging is deliberately not represented
/// here: the merge fallback chain absorbs it. Malformed externally supplied
/// IDs are likewise absent, because lookups collapse them into "not found".
#[derive(Debug, Error)]
pub enum DocketError {
    /// A mandatory slot exhausted every source. Aborts the run before any
    /// compose or persist work.
    #[error("missing required document slot: {0}")]
    MissingRequiredSource(String),

    /// Chart merge had no inputs or an unreadable input.
    #[error("chart merge failed: {0}")]
    ChartMerge(String),

    /// The composite could not be written, or a resolved source vanished
    /// before import.
    #[error("composite generation failed: {0}")]
    Compose(String),

    /// Manifest encode/write failure or directory creation failure.
    #[error("storage failure: {0}")]
    Storage(String),
}
