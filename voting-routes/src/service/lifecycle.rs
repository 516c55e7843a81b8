use crate::error::LifecycleError;
use crate::locks::TopicLocks;
use crate::metrics;
use crate::{LifecycleResult, OptLifecycleResult};
use engine::Pagination;
use error_stack::{Report, ResultExt};
use serde::Deserialize;
use tracing::{debug, instrument};
use utoipa::ToSchema;
use voting_core::model::{Topic, TopicId, TopicStatus, TopicView, UserEmail};
use voting_core::result::Mutation;
use voting_core::time::{Clock, Timestamp};
use voting_core::validation::TopicDraft;
use voting_core::{TopicRepository, VotingEngine};

pub const DEFAULT_TOPIC_PAGE_SIZE: u64 = 25;

/// How a topic is removed.
#[derive(Debug, Deserialize, ToSchema, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// The row is kept with status `deleted`.
    #[default]
    Logical,
    /// The row is removed from storage.
    Physical,
}

#[derive(Debug, Clone)]
pub struct TopicService<E> {
    engine: E,
    locks: TopicLocks,
}

fn unavailable() -> LifecycleError {
    LifecycleError::StorageUnavailable
}

/// Turn the outcome of a single row write into the topic level result.
fn applied<T>(mutation: Mutation<T>, topic_id: TopicId) -> LifecycleResult<T> {
    match mutation {
        Mutation::Applied(value) => Ok(value),
        Mutation::Missing => Err(Report::new(LifecycleError::NotFound))
            .attach_with(|| format!("topic {topic_id} disappeared before it could be changed")),
        Mutation::Ambiguous(count) => Err(Report::new(LifecycleError::AmbiguousRecords))
            .attach_with(|| format!("{count} rows carry the id {topic_id}")),
    }
}

impl<E: VotingEngine> TopicService<E> {
    pub fn new(engine: E, locks: TopicLocks) -> Self {
        Self { engine, locks }
    }

    pub fn now(&self) -> Timestamp {
        self.engine.clock().now()
    }

    #[instrument(skip_all, fields(title = %draft.title, owner = %draft.owner_email), err(Debug))]
    pub async fn create_topic(&self, draft: TopicDraft, now: Timestamp) -> LifecycleResult<TopicView> {
        let new_topic = draft
            .validate(now)
            .map_err(|rule| Report::new(LifecycleError::Validation(rule)))?;

        let topic = self
            .engine
            .topics()
            .create(new_topic)
            .await
            .change_context_lazy(unavailable)?;

        metrics::increment_topics_created();
        debug!("created topic {}", topic.id);
        Ok(topic.view(now))
    }

    /// Looks the topic up whatever its status, deleted topics included.
    #[instrument(skip(self), err(Debug))]
    pub async fn get_topic(&self, topic_id: TopicId, now: Timestamp) -> OptLifecycleResult<TopicView> {
        let topic = self
            .engine
            .topics()
            .find_by_id(topic_id)
            .await
            .change_context_lazy(unavailable)?;
        Ok(topic.map(|topic| topic.view(now)))
    }

    #[instrument(skip(self), err(Debug))]
    pub async fn list_topics(
        &self,
        pagination: Pagination,
        now: Timestamp,
    ) -> LifecycleResult<Vec<TopicView>> {
        let topics = self
            .engine
            .topics()
            .list()
            .await
            .change_context_lazy(unavailable)?;

        let page = pagination.apply(topics, DEFAULT_TOPIC_PAGE_SIZE);
        metrics::increment_topics_retrieved_by(page.len());
        Ok(page.into_iter().map(|topic| topic.view(now)).collect())
    }

    /// Topics owned by `owner` that are closed or past their deadline, for reviewing results.
    #[instrument(skip(self), fields(owner = %owner), err(Debug))]
    pub async fn list_finished_for_owner(
        &self,
        owner: &UserEmail,
        now: Timestamp,
    ) -> LifecycleResult<Vec<TopicView>> {
        let topics = self
            .engine
            .topics()
            .list()
            .await
            .change_context_lazy(unavailable)?;

        Ok(topics
            .into_iter()
            .filter(|topic| topic.is_owned_by(owner) && topic.is_finished(now))
            .map(|topic| topic.view(now))
            .collect())
    }

    #[instrument(skip(self), fields(requester = %requester), err(Debug))]
    pub async fn close_topic(
        &self,
        topic_id: TopicId,
        requester: &UserEmail,
        now: Timestamp,
    ) -> LifecycleResult<TopicView> {
        let _guard = self.locks.acquire(topic_id).await;

        let topic = self.find_topic(topic_id).await?;
        ensure_owner(&topic, requester)?;
        if matches!(topic.status, TopicStatus::Closed | TopicStatus::Deleted) {
            return Err(Report::new(LifecycleError::AlreadyClosed))
                .attach_with(|| format!("topic {topic_id} is {}", topic.status));
        }

        let mutation = self
            .engine
            .topics()
            .update_status(topic_id, TopicStatus::Closed)
            .await
            .change_context_lazy(unavailable)?;
        let closed = applied(mutation, topic_id)?;

        metrics::increment_topics_closed();
        debug!("closed topic {topic_id}");
        Ok(closed.view(now))
    }

    /// Always answers `true` once the topic is gone. Deleting an already deleted topic is
    /// `NotFound`.
    #[instrument(skip(self), fields(requester = %requester), err(Debug))]
    pub async fn delete_topic(
        &self,
        topic_id: TopicId,
        requester: &UserEmail,
        mode: DeleteMode,
    ) -> LifecycleResult<bool> {
        let _guard = self.locks.acquire(topic_id).await;

        let topic = self.find_topic(topic_id).await?;
        if topic.status == TopicStatus::Deleted {
            return Err(Report::new(LifecycleError::NotFound)).attach("the topic was already deleted");
        }
        ensure_owner(&topic, requester)?;

        let topics = self.engine.topics();
        match mode {
            DeleteMode::Logical => {
                let mutation = topics
                    .update_status(topic_id, TopicStatus::Deleted)
                    .await
                    .change_context_lazy(unavailable)?;
                applied(mutation, topic_id)?;
            }
            DeleteMode::Physical => {
                let mutation = topics
                    .remove(topic_id)
                    .await
                    .change_context_lazy(unavailable)?;
                applied(mutation, topic_id)?;
            }
        }

        metrics::increment_topics_deleted(mode);
        debug!("deleted topic {topic_id} ({mode:?})");
        Ok(true)
    }

    async fn find_topic(&self, topic_id: TopicId) -> LifecycleResult<Topic> {
        self.engine
            .topics()
            .find_by_id(topic_id)
            .await
            .change_context_lazy(unavailable)?
            .ok_or_else(|| Report::new(LifecycleError::NotFound))
    }
}

fn ensure_owner(topic: &Topic, requester: &UserEmail) -> LifecycleResult<()> {
    if topic.is_owned_by(requester) {
        Ok(())
    } else {
        Err(Report::new(LifecycleError::Forbidden))
            .attach_with(|| format!("{requester} does not own topic {}", topic.id))
    }
}
