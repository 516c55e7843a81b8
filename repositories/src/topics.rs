use crate::rows::{decode_topic, encode_topic, topic_column, topic_row_id};
use crate::sheet::{Row, SheetGateway, Table};
use error_stack::ResultExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use voting_core::TopicRepository;
use voting_core::model::{NewTopic, Topic, TopicId, TopicStatus};
use voting_core::result::{Mutation, OptRepoResult, RepoError, RepoResult};

#[derive(Debug, Clone)]
pub struct SheetTopicRepo<G> {
    sheet: G,
    /// Held from locating a row until the write to it is done. A deleted row shifts the index of
    /// every row after it, so two writes to different topics must not interleave.
    writes: Arc<Mutex<()>>,
}

impl<G: SheetGateway> SheetTopicRepo<G> {
    pub fn new(sheet: G) -> Self {
        Self {
            sheet,
            writes: Arc::default(),
        }
    }

    async fn rows(&self, context: RepoError) -> RepoResult<Vec<Row>> {
        self.sheet
            .read_rows(Table::Topics)
            .await
            .change_context(context)
    }

    /// Every decodable topic in storage order.
    async fn read_all(&self, context: RepoError) -> RepoResult<Vec<Topic>> {
        let rows = self.rows(context).await?;
        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| match decode_topic(row) {
                Ok(topic) => Some(topic),
                Err(e) => {
                    warn!("skipping topics row {index}: {e}");
                    None
                }
            })
            .collect())
    }

    /// Locate the single row carrying `id`.
    async fn locate(&self, id: TopicId, context: RepoError) -> RepoResult<Mutation<(usize, Row)>> {
        let rows = self.rows(context).await?;
        let mut matches = rows
            .into_iter()
            .enumerate()
            .filter(|(_, row)| topic_row_id(row) == Some(id))
            .collect::<Vec<_>>();

        Ok(match matches.len() {
            0 => Mutation::Missing,
            1 => Mutation::Applied(matches.remove(0)),
            n => {
                warn!("{n} topic rows share the id {id}, refusing to touch any of them");
                Mutation::Ambiguous(n)
            }
        })
    }

    /// Read the table again and check row `index` still carries `id`.
    ///
    /// Writers outside this process can still shift rows between this check and the write that
    /// follows it. The check only narrows that window.
    async fn still_at(&self, index: usize, id: TopicId, context: RepoError) -> RepoResult<bool> {
        let rows = self.rows(context).await?;
        let found = rows.get(index).and_then(topic_row_id) == Some(id);
        if !found {
            warn!("topic {id} moved away from row {index} before it could be changed");
        }
        Ok(found)
    }
}

impl<G: SheetGateway> TopicRepository for SheetTopicRepo<G> {
    #[instrument(skip(self), err(Debug))]
    async fn list(&self) -> RepoResult<Vec<Topic>> {
        let mut topics = self.read_all(RepoError::ListTopics).await?;
        topics.retain(|topic| topic.status != TopicStatus::Deleted);
        Ok(topics)
    }

    #[instrument(skip(self), err(Debug))]
    async fn find_by_id(&self, id: TopicId) -> OptRepoResult<Topic> {
        let topics = self.read_all(RepoError::FindTopic).await?;
        Ok(topics.into_iter().find(|topic| topic.id == id))
    }

    #[instrument(skip(self), err(Debug))]
    async fn find_by_title(&self, title: &str) -> OptRepoResult<Topic> {
        let topics = self.read_all(RepoError::FindTopic).await?;
        Ok(topics.into_iter().find(|topic| topic.title == title))
    }

    #[instrument(skip_all, fields(title = %new_topic.title), err(Debug))]
    async fn create(&self, new_topic: NewTopic) -> RepoResult<Topic> {
        let row = encode_topic(&new_topic.into_topic(TopicId::new()));

        self.sheet
            .append_row(Table::Topics, row.clone())
            .await
            .change_context(RepoError::CreateTopic)?;

        // hand back exactly what a later read will see
        let topic = decode_topic(&row).change_context(RepoError::CreateTopic)?;
        debug!("created topic {}", topic.id);
        Ok(topic)
    }

    #[instrument(skip(self), err(Debug))]
    async fn update_status(&self, id: TopicId, status: TopicStatus) -> RepoResult<Mutation<Topic>> {
        let _writing = self.writes.lock().await;

        let (index, row) = match self.locate(id, RepoError::UpdateTopic).await? {
            Mutation::Applied(found) => found,
            Mutation::Missing => return Ok(Mutation::Missing),
            Mutation::Ambiguous(n) => return Ok(Mutation::Ambiguous(n)),
        };

        let mut topic = decode_topic(&row)
            .change_context(RepoError::UpdateTopic)
            .attach_with(|| format!("topic {id} is stored in an unreadable row"))?;

        if !self.still_at(index, id, RepoError::UpdateTopic).await? {
            return Ok(Mutation::Missing);
        }

        self.sheet
            .update_cell(
                Table::Topics,
                index,
                topic_column::STATUS,
                status.as_str().to_string(),
            )
            .await
            .change_context(RepoError::UpdateTopic)?;

        topic.status = status;
        Ok(Mutation::Applied(topic))
    }

    #[instrument(skip(self), err(Debug))]
    async fn remove(&self, id: TopicId) -> RepoResult<Mutation<()>> {
        let _writing = self.writes.lock().await;

        let index = match self.locate(id, RepoError::RemoveTopic).await? {
            Mutation::Applied((index, _)) => index,
            Mutation::Missing => return Ok(Mutation::Missing),
            Mutation::Ambiguous(n) => return Ok(Mutation::Ambiguous(n)),
        };
        if !self.still_at(index, id, RepoError::RemoveTopic).await? {
            return Ok(Mutation::Missing);
        }

        self.sheet
            .delete_row(Table::Topics, index)
            .await
            .change_context(RepoError::RemoveTopic)
            .attach_with(|| format!("could not delete topics row {index}"))?;

        Ok(Mutation::Applied(()))
    }
}
