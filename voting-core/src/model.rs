use crate::time::Timestamp;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Copy, Clone)]
#[repr(transparent)]
#[serde(transparent)]
#[schema(value_type = String, format = Uuid)]
pub struct TopicId(Uuid);

impl TopicId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TopicId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TopicId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for TopicId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl Display for TopicId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("a user email cannot be empty")]
pub struct EmptyEmail;

/// The identity of a user. Surrounding whitespace and letter case are never significant, so
/// `A@x.com` and ` a@x.com` are the same user.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, Clone)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserEmail {
    type Error = EmptyEmail;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(EmptyEmail)
    }
}

impl From<UserEmail> for String {
    fn from(value: UserEmail) -> Self {
        value.0
    }
}

impl Display for UserEmail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// The voter picks one of the topic's options.
    ChoiceSet,
    /// The voter writes their own answer.
    FreeText,
}

/// The stored status of a topic.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    Active,
    Closed,
    Deleted,
}

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a topic status")]
pub struct UnknownStatus(String);

impl TopicStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicStatus::Active => "active",
            TopicStatus::Closed => "closed",
            TopicStatus::Deleted => "deleted",
        }
    }

    /// Statuses only move forward. `Deleted` is terminal.
    pub fn can_transition_to(&self, next: TopicStatus) -> bool {
        matches!(
            (self, next),
            (TopicStatus::Active, TopicStatus::Closed)
                | (TopicStatus::Active, TopicStatus::Deleted)
                | (TopicStatus::Closed, TopicStatus::Deleted)
        )
    }
}

impl FromStr for TopicStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TopicStatus::Active),
            "closed" => Ok(TopicStatus::Closed),
            "deleted" => Ok(TopicStatus::Deleted),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

impl Display for TopicStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a topic looks like at a given instant: its stored status combined with its deadline.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Copy, Clone)]
#[serde(rename_all = "snake_case")]
pub enum TopicState {
    Active,
    Closed,
    Expired,
    Deleted,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub title: String,
    pub author: String,
    pub owner_email: UserEmail,
    pub answer_kind: AnswerKind,
    /// Declared options in display order. Always empty for free text topics.
    pub options: Vec<String>,
    pub deadline: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub status: TopicStatus,
}

impl Topic {
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.deadline.is_some_and(|deadline| now > deadline)
    }

    pub fn is_votable(&self, now: Timestamp) -> bool {
        self.status == TopicStatus::Active && !self.is_expired(now)
    }

    pub fn state(&self, now: Timestamp) -> TopicState {
        match self.status {
            TopicStatus::Deleted => TopicState::Deleted,
            TopicStatus::Closed => TopicState::Closed,
            TopicStatus::Active if self.is_expired(now) => TopicState::Expired,
            TopicStatus::Active => TopicState::Active,
        }
    }

    /// Closed or past its deadline, but not deleted.
    pub fn is_finished(&self, now: Timestamp) -> bool {
        matches!(self.state(now), TopicState::Closed | TopicState::Expired)
    }

    pub fn is_owned_by(&self, user: &UserEmail) -> bool {
        &self.owner_email == user
    }

    pub fn view(self, now: Timestamp) -> TopicView {
        TopicView {
            state: self.state(now),
            topic: self,
        }
    }

    /// The answer as it should be recorded, or `None` if it does not fit this topic.
    ///
    /// Choices must match a declared option exactly, case included. Free text is trimmed and
    /// must not end up empty.
    pub fn accept_answer(&self, answer: &str) -> Option<String> {
        match self.answer_kind {
            AnswerKind::ChoiceSet => self
                .options
                .iter()
                .find(|option| option.as_str() == answer)
                .cloned(),
            AnswerKind::FreeText => {
                let answer = answer.trim();
                (!answer.is_empty()).then(|| answer.to_string())
            }
        }
    }
}

/// A topic together with the state it is in at the time it was read.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct TopicView {
    #[serde(flatten)]
    pub topic: Topic,
    pub state: TopicState,
}

/// A topic that passed validation and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub title: String,
    pub author: String,
    pub owner_email: UserEmail,
    pub answer_kind: AnswerKind,
    pub options: Vec<String>,
    pub deadline: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl NewTopic {
    pub fn into_topic(self, id: TopicId) -> Topic {
        Topic {
            id,
            title: self.title,
            author: self.author,
            owner_email: self.owner_email,
            answer_kind: self.answer_kind,
            options: self.options,
            deadline: self.deadline,
            created_at: self.created_at,
            status: TopicStatus::Active,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct Vote {
    pub topic_id: TopicId,
    pub answer: String,
    pub voter_email: UserEmail,
    pub voted_at: DateTime<FixedOffset>,
}
