use crate::locks::TopicLocks;
use crate::metrics::{self, MetricsSetupError};
use crate::service::{TopicService, VoteService};
use axum::extract::FromRef;
use error_stack::Report;
use metrics_exporter_prometheus::PrometheusHandle;
use voting_core::VotingEngine;

pub type StateResult<T> = Result<T, Report<MetricsSetupError>>;

#[derive(Clone)]
pub struct VotingAppState<E: VotingEngine> {
    pub topics: TopicService<E>,
    pub votes: VoteService<E>,
    pub metrics: Option<PrometheusHandle>,
}

impl<E: VotingEngine> VotingAppState<E> {
    pub fn new_with_metrics(engine: E) -> StateResult<Self> {
        let mut state = Self::new_without_metrics(engine);
        state.metrics = Some(metrics::setup_recorder()?);
        Ok(state)
    }

    pub fn new_without_metrics(engine: E) -> Self {
        // both services must share one lock set for a vote to exclude a concurrent close
        let locks = TopicLocks::new();
        Self {
            topics: TopicService::new(engine.clone(), locks.clone()),
            votes: VoteService::new(engine, locks),
            metrics: None,
        }
    }
}

impl<E: VotingEngine> FromRef<VotingAppState<E>> for TopicService<E> {
    fn from_ref(input: &VotingAppState<E>) -> Self {
        input.topics.clone()
    }
}

impl<E: VotingEngine> FromRef<VotingAppState<E>> for VoteService<E> {
    fn from_ref(input: &VotingAppState<E>) -> Self {
        input.votes.clone()
    }
}
