use axum::http::StatusCode;
use engine::error::ErrorStatus;
use voting_core::validation::ValidationRule;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("the requested topic does not exist")]
    TopicNotFound,
    #[error("the topic is not accepting votes")]
    TopicNotVotable,
    #[error("a vote has already been cast on this topic")]
    DuplicateVote,
    #[error("the answer is not valid for this topic")]
    InvalidAnswer,
    #[error("topic storage is unavailable, try again later")]
    StorageUnavailable,
}

impl ErrorStatus for VoteError {
    fn status_code(&self) -> StatusCode {
        match self {
            VoteError::TopicNotFound => StatusCode::NOT_FOUND,
            VoteError::TopicNotVotable | VoteError::DuplicateVote => StatusCode::CONFLICT,
            VoteError::InvalidAnswer => StatusCode::UNPROCESSABLE_ENTITY,
            VoteError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("{0}")]
    Validation(ValidationRule),
    #[error("only the owner of the topic can do this")]
    Forbidden,
    #[error("the requested topic does not exist")]
    NotFound,
    #[error("the topic is already closed")]
    AlreadyClosed,
    #[error("the topic is stored more than once and cannot be changed safely")]
    AmbiguousRecords,
    #[error("topic storage is unavailable, try again later")]
    StorageUnavailable,
}

impl ErrorStatus for LifecycleError {
    fn status_code(&self) -> StatusCode {
        match self {
            LifecycleError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LifecycleError::Forbidden => StatusCode::FORBIDDEN,
            LifecycleError::NotFound => StatusCode::NOT_FOUND,
            LifecycleError::AlreadyClosed | LifecycleError::AmbiguousRecords => {
                StatusCode::CONFLICT
            }
            LifecycleError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}
