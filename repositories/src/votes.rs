use crate::rows::{decode_vote, encode_vote};
use crate::sheet::{SheetGateway, Table};
use error_stack::ResultExt;
use tracing::{debug, instrument, warn};
use voting_core::VoteRepository;
use voting_core::model::{TopicId, UserEmail, Vote};
use voting_core::result::{RepoError, RepoResult};
use voting_core::time::to_storage_precision;

#[derive(Debug, Clone)]
pub struct SheetVoteRepo<G> {
    sheet: G,
}

impl<G: SheetGateway> SheetVoteRepo<G> {
    pub fn new(sheet: G) -> Self {
        Self { sheet }
    }
}

impl<G: SheetGateway> VoteRepository for SheetVoteRepo<G> {
    #[instrument(skip(self), err(Debug))]
    async fn list_for_topic(&self, topic_id: TopicId) -> RepoResult<Vec<Vote>> {
        let rows = self
            .sheet
            .read_rows(Table::Votes)
            .await
            .change_context(RepoError::ListVotes)?;

        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| match decode_vote(row) {
                Ok(vote) => Some(vote),
                Err(e) => {
                    warn!("skipping votes row {index}: {e}");
                    None
                }
            })
            .filter(|vote| vote.topic_id == topic_id)
            .collect())
    }

    #[instrument(skip(self), err(Debug))]
    async fn has_voted(&self, topic_id: TopicId, voter: &UserEmail) -> RepoResult<bool> {
        let votes = self.list_for_topic(topic_id).await?;
        Ok(votes.iter().any(|vote| &vote.voter_email == voter))
    }

    #[instrument(skip_all, fields(topic_id = %vote.topic_id), err(Debug))]
    async fn record(&self, mut vote: Vote) -> RepoResult<Vote> {
        vote.voted_at = to_storage_precision(vote.voted_at);

        self.sheet
            .append_row(Table::Votes, encode_vote(&vote))
            .await
            .change_context(RepoError::RecordVote)?;

        debug!("recorded vote by {} on {}", vote.voter_email, vote.topic_id);
        Ok(vote)
    }
}
