use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::borrow::Cow;
use utoipa::ToSchema;
use voting_core::model::{Topic, TopicId, TopicState, TopicView, Vote};
use voting_core::tally::{Tally, TallyEntry};

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicResponse {
    #[serde(skip)]
    status_code: StatusCode,
    #[serde(flatten)]
    topic: TopicView,
}

impl TopicResponse {
    pub fn ok(topic: TopicView) -> Self {
        Self {
            status_code: StatusCode::OK,
            topic,
        }
    }

    pub fn created(topic: TopicView) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            topic,
        }
    }
}

impl IntoResponse for TopicResponse {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteResponse {
    #[serde(flatten)]
    vote: Vote,
}

impl VoteResponse {
    pub fn new(vote: Vote) -> Self {
        Self { vote }
    }
}

impl IntoResponse for VoteResponse {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoteStatusResponse {
    /// Whether the acting user has already voted on the topic.
    pub voted: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TallyResponse {
    topic_id: TopicId,
    title: String,
    state: TopicState,
    total: u64,
    /// Declared options in order for choice topics, most popular first for free text.
    entries: Vec<TallyEntry>,
}

impl TallyResponse {
    pub fn new(topic: Topic, state: TopicState, tally: Tally) -> Self {
        Self {
            topic_id: topic.id,
            title: topic.title,
            state,
            total: tally.total(),
            entries: tally.entries().to_vec(),
        }
    }
}

impl IntoResponse for TallyResponse {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TopicError {
    #[serde(skip)]
    status_code: StatusCode,
    message: Cow<'static, str>,
}

impl TopicError {
    pub fn not_found() -> Self {
        Self {
            status_code: StatusCode::NOT_FOUND,
            message: "the requested topic does not exist".into(),
        }
    }
}

impl IntoResponse for TopicError {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}
