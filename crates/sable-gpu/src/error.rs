//! GPU tracking error types.

use thiserror::Error;

/// Errors surfaced by recording and submission.
///
/// Pool and registry lookups are never errors; stale-handle misuse is
/// reported as absence or a `false` return at the call site instead.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Recorder creation was refused by the execution backend.
    #[error("Recorder initialization failed: {0}")]
    RecorderInit(String),

    /// The backend rejected a submitted instruction stream.
    #[error("Submission failed: {0}")]
    Submission(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;
