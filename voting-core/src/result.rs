use error_stack::Report;

pub type RepoResult<T> = Result<T, Report<RepoError>>;
pub type OptRepoResult<T> = Result<Option<T>, Report<RepoError>>;

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum RepoError {
    #[error("failed to list topics")]
    ListTopics,
    #[error("failed to find topic")]
    FindTopic,
    #[error("failed to create topic")]
    CreateTopic,
    #[error("failed to update topic")]
    UpdateTopic,
    #[error("failed to remove topic")]
    RemoveTopic,
    #[error("failed to list votes")]
    ListVotes,
    #[error("failed to record vote")]
    RecordVote,
}

/// Outcome of a write that targets one existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    Applied(T),
    /// No row carries the id.
    Missing,
    /// More than one row carries the id, none of them were touched.
    Ambiguous(usize),
}
