use crate::model::{AnswerKind, Vote};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq)]
pub struct TallyEntry {
    pub answer: String,
    pub count: u64,
}

/// Vote counts per answer, in display order.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct Tally(Vec<TallyEntry>);

impl Tally {
    /// Count `votes` for a topic.
    ///
    /// Choice topics list every declared option in declared order, including options nobody
    /// picked. Answers outside the declared options are not counted. Free text topics list each
    /// distinct answer, most popular first, ties kept in the order they were first submitted.
    pub fn count(answer_kind: AnswerKind, options: &[String], votes: &[Vote]) -> Self {
        let counts = votes.iter().map(|vote| vote.answer.as_str()).counts();

        let entries = match answer_kind {
            AnswerKind::ChoiceSet => options
                .iter()
                .map(|option| TallyEntry {
                    answer: option.clone(),
                    count: counts.get(option.as_str()).copied().unwrap_or(0) as u64,
                })
                .collect(),
            AnswerKind::FreeText => votes
                .iter()
                .map(|vote| vote.answer.as_str())
                .unique()
                .map(|answer| TallyEntry {
                    answer: answer.to_string(),
                    count: counts[answer] as u64,
                })
                .sorted_by(|a, b| b.count.cmp(&a.count))
                .collect(),
        };

        Self(entries)
    }

    pub fn entries(&self) -> &[TallyEntry] {
        &self.0
    }

    pub fn get(&self, answer: &str) -> Option<u64> {
        self.0
            .iter()
            .find(|entry| entry.answer == answer)
            .map(|entry| entry.count)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|entry| entry.count).sum()
    }
}
