//! Job run errors.

use thiserror::Error;

/// Errors a job run can end with.
///
/// The error is stored on the [`Execution`](crate::Execution) that recorded the
/// run, so it is `Clone` and carries rendered messages instead of sources.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The workload terminated with a non-zero exit code.
    #[error("exit code: {0}")]
    NonZeroExit(i64),

    /// The workload did not reach a terminal state within the allowed time.
    #[error("maximum run time exceeded")]
    MaxTimeRunning,

    /// The run was skipped by a middleware (e.g. overlap prevention).
    #[error("execution skipped")]
    Skipped,

    /// Any other failure, already wrapped with its context.
    #[error("{0}")]
    Failed(String),
}

impl JobError {
    /// Create a generic failure from anything printable.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Exit code carried by the error, if it came from the workload itself.
    pub fn exit_code(&self) -> Option<i64> {
        match self {
            Self::NonZeroExit(code) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_zero_exit_message_contains_code() {
        let err = JobError::NonZeroExit(3);
        assert_eq!(err.to_string(), "exit code: 3");
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn test_failed_has_no_exit_code() {
        assert_eq!(JobError::failed("boom").exit_code(), None);
        assert_eq!(JobError::MaxTimeRunning.exit_code(), None);
    }
}
