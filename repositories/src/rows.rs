//! Conversion between typed entities and sheet rows.
use crate::sheet::Row;
use itertools::Itertools;
use voting_core::model::{AnswerKind, Topic, TopicId, TopicStatus, UserEmail, Vote};
use voting_core::time::{format_deadline, format_recorded_at, parse_deadline, parse_recorded_at};
use voting_core::validation::{FREE_TEXT_MARKER, OPTION_SEPARATOR};

pub mod topic_column {
    pub const TITLE: usize = 0;
    pub const AUTHOR: usize = 1;
    pub const OPTIONS: usize = 2;
    pub const DEADLINE: usize = 3;
    pub const CREATED_AT: usize = 4;
    pub const STATUS: usize = 5;
    pub const OWNER_EMAIL: usize = 6;
    pub const ID: usize = 7;

    pub const COUNT: usize = 8;
}

pub mod vote_column {
    pub const TOPIC_ID: usize = 0;
    pub const ANSWER: usize = 1;
    pub const VOTED_AT: usize = 2;
    pub const VOTER_EMAIL: usize = 3;

    pub const COUNT: usize = 4;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RowError {
    #[error("column {0} is missing")]
    MissingColumn(usize),
    #[error("column {column} holds an invalid value '{value}'")]
    InvalidValue { column: usize, value: String },
}

fn cell(row: &Row, column: usize) -> Result<&str, RowError> {
    row.get(column)
        .map(|value| value.as_str())
        .ok_or(RowError::MissingColumn(column))
}

fn invalid(column: usize, value: &str) -> RowError {
    RowError::InvalidValue {
        column,
        value: value.to_string(),
    }
}

fn parse_cell<T, E>(
    row: &Row,
    column: usize,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, RowError> {
    let value = cell(row, column)?;
    parse(value).map_err(|_| invalid(column, value))
}

pub fn encode_topic(topic: &Topic) -> Row {
    let options = match topic.answer_kind {
        AnswerKind::FreeText => FREE_TEXT_MARKER.to_string(),
        AnswerKind::ChoiceSet => topic.options.iter().join(&OPTION_SEPARATOR.to_string()),
    };

    let mut row = vec![String::new(); topic_column::COUNT];
    row[topic_column::TITLE] = topic.title.clone();
    row[topic_column::AUTHOR] = topic.author.clone();
    row[topic_column::OPTIONS] = options;
    row[topic_column::DEADLINE] = topic.deadline.as_ref().map(format_deadline).unwrap_or_default();
    row[topic_column::CREATED_AT] = format_recorded_at(&topic.created_at);
    row[topic_column::STATUS] = topic.status.as_str().to_string();
    row[topic_column::OWNER_EMAIL] = topic.owner_email.to_string();
    row[topic_column::ID] = topic.id.to_string();
    row
}

pub fn decode_topic(row: &Row) -> Result<Topic, RowError> {
    use topic_column::*;

    let id = parse_cell(row, ID, str::parse::<TopicId>)?;
    let raw_options = cell(row, OPTIONS)?.trim();
    let (answer_kind, options) = if raw_options == FREE_TEXT_MARKER {
        (AnswerKind::FreeText, vec![])
    } else {
        let options = raw_options
            .split(OPTION_SEPARATOR)
            .map(str::trim)
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();
        (AnswerKind::ChoiceSet, options)
    };

    Ok(Topic {
        id,
        title: cell(row, TITLE)?.to_string(),
        author: cell(row, AUTHOR)?.to_string(),
        owner_email: parse_cell(row, OWNER_EMAIL, |v| UserEmail::parse(v).ok_or(()))?,
        answer_kind,
        options,
        deadline: parse_cell(row, DEADLINE, parse_deadline)?,
        created_at: parse_cell(row, CREATED_AT, parse_recorded_at)?,
        status: parse_cell(row, STATUS, str::parse::<TopicStatus>)?,
    })
}

/// The id cell alone, so rows can be matched without decoding the rest of them.
pub fn topic_row_id(row: &Row) -> Option<TopicId> {
    row.get(topic_column::ID)?.parse().ok()
}

pub fn encode_vote(vote: &Vote) -> Row {
    let mut row = vec![String::new(); vote_column::COUNT];
    row[vote_column::TOPIC_ID] = vote.topic_id.to_string();
    row[vote_column::ANSWER] = vote.answer.clone();
    row[vote_column::VOTED_AT] = format_recorded_at(&vote.voted_at);
    row[vote_column::VOTER_EMAIL] = vote.voter_email.to_string();
    row
}

pub fn decode_vote(row: &Row) -> Result<Vote, RowError> {
    use vote_column::*;

    Ok(Vote {
        topic_id: parse_cell(row, TOPIC_ID, str::parse::<TopicId>)?,
        answer: cell(row, ANSWER)?.to_string(),
        voted_at: parse_cell(row, VOTED_AT, parse_recorded_at)?,
        voter_email: parse_cell(row, VOTER_EMAIL, |v| UserEmail::parse(v).ok_or(()))?,
    })
}
