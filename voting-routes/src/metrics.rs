use crate::error::VoteError;
use crate::service::DeleteMode;
use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::IntoResponse;
use error_stack::{Report, ResultExt};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;

const TOPICS_RETRIEVED_METRIC_NAME: &str = "topics_retrieved";
const REQUEST_DURATION_METRIC_NAME: &str = "http_requests_duration_seconds";
const REQUEST_SIZE_METRIC_NAME: &str = "http_request_size";
const REQUESTS_TOTAL_METRIC_NAME: &str = "http_requests_total";

const TOPICS_CREATED_METRIC_NAME: &str = "num_topics_created";
const TOPICS_CLOSED_METRIC_NAME: &str = "num_topics_closed";
const TOPICS_DELETED_METRIC_NAME: &str = "num_topics_deleted";

const VOTES_CAST_METRIC_NAME: &str = "num_votes_cast";
const VOTES_REJECTED_METRIC_NAME: &str = "num_votes_rejected";

#[derive(Debug, thiserror::Error)]
#[error("failed to set up the metrics recorder")]
pub struct MetricsSetupError;

// the recorder is global, every state built in this process shares it
static RECORDER: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

pub fn setup_recorder() -> Result<PrometheusHandle, Report<MetricsSetupError>> {
    const EXPONENTIAL_SECONDS: &[f64] = &[0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

    const REQ_RES_BUCKETS: &[f64] = &[128.0, 256.0, 512.0, 1024.0, 2048.0, 4096.0, 8192.0, 16384.0];

    let mut recorder = RECORDER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = recorder.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_METRIC_NAME.to_string()),
            EXPONENTIAL_SECONDS,
        )
        .change_context(MetricsSetupError)?
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_SIZE_METRIC_NAME.to_string()),
            REQ_RES_BUCKETS,
        )
        .change_context(MetricsSetupError)?
        .install_recorder()
        .change_context(MetricsSetupError)
        .attach("another metrics recorder is probably installed already")?;

    *recorder = Some(handle.clone());
    Ok(handle)
}

pub async fn track_http(req: Request, next: Next) -> impl IntoResponse {
    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    if path.ends_with("metrics") {
        return next.run(req).await;
    }

    let method = req.method().clone();

    let req_size = req
        .headers()
        .get("Content-Length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<usize>().ok());

    if let Some(req_size) = req_size {
        metrics::histogram!(REQUEST_SIZE_METRIC_NAME).record(req_size as f64);
    }

    let start = Instant::now();
    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    metrics::counter!(REQUESTS_TOTAL_METRIC_NAME, &labels).increment(1);

    let histogram = metrics::histogram!(REQUEST_DURATION_METRIC_NAME, &labels);
    histogram.record(latency);
    response
}

#[inline]
pub fn increment_topics_retrieved_by(amt: usize) {
    metrics::counter!(TOPICS_RETRIEVED_METRIC_NAME).increment(amt as u64);
}

#[inline]
pub fn increment_topics_created() {
    metrics::counter!(TOPICS_CREATED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_topics_closed() {
    metrics::counter!(TOPICS_CLOSED_METRIC_NAME).increment(1);
}

#[inline]
pub fn increment_topics_deleted(mode: DeleteMode) {
    let mode = match mode {
        DeleteMode::Logical => "logical",
        DeleteMode::Physical => "physical",
    };
    metrics::counter!(TOPICS_DELETED_METRIC_NAME, "mode" => mode).increment(1);
}

#[inline]
pub fn increment_votes_cast() {
    metrics::counter!(VOTES_CAST_METRIC_NAME).increment(1);
}

pub fn increment_votes_rejected(reason: &VoteError) {
    let reason = match reason {
        VoteError::TopicNotFound => "topic_not_found",
        VoteError::TopicNotVotable => "topic_not_votable",
        VoteError::DuplicateVote => "duplicate_vote",
        VoteError::InvalidAnswer => "invalid_answer",
        VoteError::StorageUnavailable => "storage_unavailable",
    };
    metrics::counter!(VOTES_REJECTED_METRIC_NAME, "reason" => reason).increment(1);
}
