use crate::model::{AnswerKind, NewTopic, UserEmail};
use crate::time::{Timestamp, to_deadline_precision, to_storage_precision};
use itertools::Itertools;
use serde::Serialize;
use utoipa::ToSchema;

/// Marker stored in place of the option list for free text topics.
pub const FREE_TEXT_MARKER: &str = "FREE_INPUT";
/// Separator used to join options into a single storage cell.
pub const OPTION_SEPARATOR: char = '/';

pub const MIN_OPTIONS: usize = 2;

/// The specific rule a topic draft broke.
#[derive(Debug, thiserror::Error, Serialize, ToSchema, Clone, PartialEq, Eq)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum ValidationRule {
    #[error("the title cannot be empty")]
    EmptyTitle,
    #[error("the deadline '{0}' is not in the YYYY-MM-DD HH:MM format")]
    MalformedDeadline(String),
    #[error("the deadline must be later than the time the topic is created")]
    DeadlineNotInFuture,
    #[error("at least two non-empty options are required")]
    TooFewOptions,
    #[error("the option '{0}' is listed more than once")]
    DuplicateOption(String),
    #[error("the option '{0}' cannot contain '/'")]
    ReservedSeparator(String),
    #[error("'{0}' cannot be used as an option")]
    ReservedOption(String),
}

/// A topic as submitted by its creator, before any rule has been checked.
#[derive(Debug, Clone)]
pub struct TopicDraft {
    pub title: String,
    pub author: String,
    pub owner_email: UserEmail,
    pub answer_kind: AnswerKind,
    pub options: Vec<String>,
    pub deadline: Option<Timestamp>,
}

impl TopicDraft {
    /// Check every creation rule against `now`, the creation time.
    ///
    /// Options are trimmed and blank entries dropped before counting, matching how a form with
    /// some empty option inputs is read. Free text topics ignore any options they were given.
    pub fn validate(self, now: Timestamp) -> Result<NewTopic, ValidationRule> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationRule::EmptyTitle);
        }

        let created_at = to_storage_precision(now);
        let deadline = self.deadline.map(to_deadline_precision);
        if let Some(deadline) = deadline {
            if deadline <= created_at {
                return Err(ValidationRule::DeadlineNotInFuture);
            }
        }

        let options = match self.answer_kind {
            AnswerKind::ChoiceSet => validate_options(self.options)?,
            AnswerKind::FreeText => Vec::new(),
        };

        Ok(NewTopic {
            title: title.to_string(),
            author: self.author.trim().to_string(),
            owner_email: self.owner_email,
            answer_kind: self.answer_kind,
            options,
            deadline,
            created_at,
        })
    }
}

fn validate_options(options: Vec<String>) -> Result<Vec<String>, ValidationRule> {
    let options = options
        .iter()
        .map(|option| option.trim())
        .filter(|option| !option.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();

    if let Some(option) = options.iter().find(|o| o.contains(OPTION_SEPARATOR)) {
        return Err(ValidationRule::ReservedSeparator(option.clone()));
    }

    if let Some(option) = options.iter().find(|o| o.as_str() == FREE_TEXT_MARKER) {
        return Err(ValidationRule::ReservedOption(option.clone()));
    }

    if let Some(option) = options.iter().duplicates().next() {
        return Err(ValidationRule::DuplicateOption(option.clone()));
    }

    if options.len() < MIN_OPTIONS {
        return Err(ValidationRule::TooFewOptions);
    }

    Ok(options)
}
