use crate::VoteResult;
use crate::error::VoteError;
use crate::locks::TopicLocks;
use crate::metrics;
use error_stack::{Report, ResultExt};
use tracing::{debug, instrument};
use voting_core::model::{Topic, TopicId, TopicStatus, UserEmail, Vote};
use voting_core::tally::Tally;
use voting_core::time::{Clock, Timestamp};
use voting_core::{TopicRepository, VoteRepository, VotingEngine};

#[derive(Debug, Clone)]
pub struct VoteService<E> {
    engine: E,
    locks: TopicLocks,
}

impl<E: VotingEngine> VoteService<E> {
    pub fn new(engine: E, locks: TopicLocks) -> Self {
        Self { engine, locks }
    }

    pub fn now(&self) -> Timestamp {
        self.engine.clock().now()
    }

    /// Record `voter`'s answer on a topic.
    ///
    /// Every check reads storage again. While the vote is cast the topic is locked against
    /// other votes, closes and deletes issued through this process.
    #[instrument(skip(self, answer), fields(voter = %voter), err(Debug))]
    pub async fn cast_vote(
        &self,
        topic_id: TopicId,
        voter: UserEmail,
        answer: &str,
        now: Timestamp,
    ) -> VoteResult<Vote> {
        let _guard = self.locks.acquire(topic_id).await;

        let result = self.cast_vote_locked(topic_id, voter, answer, now).await;
        match &result {
            Ok(_) => metrics::increment_votes_cast(),
            Err(e) => metrics::increment_votes_rejected(e.current_context()),
        }
        result
    }

    async fn cast_vote_locked(
        &self,
        topic_id: TopicId,
        voter: UserEmail,
        answer: &str,
        now: Timestamp,
    ) -> VoteResult<Vote> {
        let topic = self.find_topic(topic_id).await?;

        if !topic.is_votable(now) {
            return Err(Report::new(VoteError::TopicNotVotable))
                .attach_with(|| format!("topic {topic_id} is {:?}", topic.state(now)));
        }

        let votes = self.engine.votes();
        if votes
            .has_voted(topic_id, &voter)
            .await
            .change_context(VoteError::StorageUnavailable)?
        {
            return Err(Report::new(VoteError::DuplicateVote));
        }

        let answer = topic
            .accept_answer(answer)
            .ok_or_else(|| Report::new(VoteError::InvalidAnswer))?;

        let vote = votes
            .record(Vote {
                topic_id,
                answer,
                voter_email: voter,
                voted_at: now,
            })
            .await
            .change_context(VoteError::StorageUnavailable)?;

        debug!("vote recorded on topic {topic_id}");
        Ok(vote)
    }

    #[instrument(skip(self), fields(voter = %voter), err(Debug))]
    pub async fn has_voted(&self, topic_id: TopicId, voter: &UserEmail) -> VoteResult<bool> {
        self.find_live_topic(topic_id).await?;

        self.engine
            .votes()
            .has_voted(topic_id, voter)
            .await
            .change_context(VoteError::StorageUnavailable)
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn tally(&self, topic_id: TopicId) -> VoteResult<(Topic, Tally)> {
        let topic = self.find_live_topic(topic_id).await?;

        let tally = self
            .engine
            .votes()
            .tally(&topic)
            .await
            .change_context(VoteError::StorageUnavailable)?;
        Ok((topic, tally))
    }

    async fn find_topic(&self, topic_id: TopicId) -> VoteResult<Topic> {
        self.engine
            .topics()
            .find_by_id(topic_id)
            .await
            .change_context(VoteError::StorageUnavailable)?
            .ok_or_else(|| Report::new(VoteError::TopicNotFound))
    }

    async fn find_live_topic(&self, topic_id: TopicId) -> VoteResult<Topic> {
        let topic = self.find_topic(topic_id).await?;
        if topic.status == TopicStatus::Deleted {
            return Err(Report::new(VoteError::TopicNotFound)).attach("the topic was deleted");
        }
        Ok(topic)
    }
}
