use crate::service::DeleteMode;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use voting_core::model::{AnswerKind, UserEmail};
use voting_core::time::parse_deadline;
use voting_core::validation::{TopicDraft, ValidationRule};

fn default_answer_kind() -> AnswerKind {
    AnswerKind::ChoiceSet
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTopicRequest {
    pub title: String,
    /// Display name of whoever asks the question.
    pub author: String,
    #[serde(default = "default_answer_kind")]
    pub answer_kind: AnswerKind,
    /// Ignored for free text topics.
    #[serde(default)]
    pub options: Vec<String>,
    /// `YYYY-MM-DD HH:MM` at UTC+9. A bare `YYYY-MM-DD` means the end of that day.
    #[schema(example = "2025-01-31 18:00")]
    pub deadline: Option<String>,
}

impl CreateTopicRequest {
    pub fn into_draft(self, owner: UserEmail) -> Result<TopicDraft, ValidationRule> {
        let deadline = match self.deadline {
            Some(raw) => parse_deadline(&raw).map_err(|_| ValidationRule::MalformedDeadline(raw))?,
            None => None,
        };

        Ok(TopicDraft {
            title: self.title,
            author: self.author,
            owner_email: owner,
            answer_kind: self.answer_kind,
            options: self.options,
            deadline,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CastVoteRequest {
    pub answer: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteParams {
    /// Remove the row from storage instead of marking the topic deleted.
    #[serde(default)]
    pub physical: bool,
}

impl DeleteParams {
    pub fn mode(&self) -> DeleteMode {
        if self.physical {
            DeleteMode::Physical
        } else {
            DeleteMode::Logical
        }
    }
}
