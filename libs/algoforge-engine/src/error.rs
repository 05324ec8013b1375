use algoforge_common::types::{JobStatus, UnsupportedLanguage};
use uuid::Uuid;

/// Failures that prevent a request from producing a classified result.
///
/// Compile errors, runtime errors and timeouts are not errors at this level:
/// they are ordinary [`crate::Outcome`] values recorded on the job.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error(transparent)]
    UnsupportedLanguage(#[from] UnsupportedLanguage),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("failed to materialize submission: {0}")]
    Materialization(#[source] std::io::Error),

    #[error("execution capacity exhausted, try again later")]
    Busy,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The job was recorded but the pipeline failed before classification.
    /// The job has already been marked `error` with `message`.
    #[error("{message}")]
    Aborted { job_id: Uuid, message: String },
}

impl ExecutionError {
    pub fn job_id(&self) -> Option<Uuid> {
        match self {
            ExecutionError::Aborted { job_id, .. } => Some(*job_id),
            _ => None,
        }
    }

    /// Whether the caller sent something the service will never accept
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ExecutionError::UnsupportedLanguage(_) | ExecutionError::InvalidRequest(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {0} already completed")]
    AlreadyCompleted(Uuid),

    #[error("cannot complete a job with non-terminal status '{0}'")]
    InvalidTransition(JobStatus),
}
