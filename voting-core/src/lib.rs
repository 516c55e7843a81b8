use model::{NewTopic, Topic, TopicId, TopicStatus, UserEmail, Vote};
use result::{Mutation, OptRepoResult, RepoResult};
use tally::Tally;
use time::Clock;

pub mod model;
pub mod result;
pub mod tally;
pub mod time;
pub mod validation;

pub trait VotingEngine: Clone + Send + Sync + 'static {
    type Topics: TopicRepository;
    type Votes: VoteRepository;
    type Clock: Clock;

    fn topics(&self) -> Self::Topics;
    fn votes(&self) -> Self::Votes;
    fn clock(&self) -> Self::Clock;
}

/// Every read goes to storage. Implementations keep no cache, so a decision made on a read
/// reflects what storage held at that moment.
pub trait TopicRepository: Send + Sync + Clone + 'static {
    /// All topics that are not logically deleted, in storage order.
    fn list(&self) -> impl Future<Output = RepoResult<Vec<Topic>>> + Send;

    /// First topic with `id`, deleted ones included.
    fn find_by_id(&self, id: TopicId) -> impl Future<Output = OptRepoResult<Topic>> + Send;

    /// First topic titled `title`, deleted ones included. Titles are not unique, prefer
    /// [`TopicRepository::find_by_id`].
    fn find_by_title(&self, title: &str) -> impl Future<Output = OptRepoResult<Topic>> + Send;

    fn create(&self, new_topic: NewTopic) -> impl Future<Output = RepoResult<Topic>> + Send;

    fn update_status(
        &self,
        id: TopicId,
        status: TopicStatus,
    ) -> impl Future<Output = RepoResult<Mutation<Topic>>> + Send;

    /// Physically remove the topic row.
    fn remove(&self, id: TopicId) -> impl Future<Output = RepoResult<Mutation<()>>> + Send;
}

pub trait VoteRepository: Send + Sync + Clone + 'static {
    fn list_for_topic(&self, topic_id: TopicId)
    -> impl Future<Output = RepoResult<Vec<Vote>>> + Send;

    fn has_voted(
        &self,
        topic_id: TopicId,
        voter: &UserEmail,
    ) -> impl Future<Output = RepoResult<bool>> + Send;

    fn record(&self, vote: Vote) -> impl Future<Output = RepoResult<Vote>> + Send;

    fn tally(&self, topic: &Topic) -> impl Future<Output = RepoResult<Tally>> + Send {
        async move {
            let votes = self.list_for_topic(topic.id).await?;
            Ok(Tally::count(topic.answer_kind, &topic.options, &votes))
        }
    }
}
