use crate::sheet::SheetGateway;
use crate::topics::SheetTopicRepo;
use crate::votes::SheetVoteRepo;
use error_stack::Report;
use voting_core::VotingEngine;
use voting_core::time::{Clock, SystemClock};

pub mod rows;
pub mod sheet;
pub mod topics;
pub mod votes;

pub type RepoInitResult<T> = Result<T, Report<RepoInitErr>>;

#[derive(Debug, thiserror::Error)]
#[error("failed to initialize repository")]
pub struct RepoInitErr;

/// Topics and votes stored in two tables of the same sheet.
#[derive(Debug, Clone)]
pub struct SheetEngine<G, C = SystemClock> {
    topics: SheetTopicRepo<G>,
    votes: SheetVoteRepo<G>,
    clock: C,
}

impl<G: SheetGateway> SheetEngine<G> {
    pub fn new(sheet: G) -> Self {
        Self::with_clock(sheet, SystemClock)
    }
}

impl<G: SheetGateway, C: Clock> SheetEngine<G, C> {
    pub fn with_clock(sheet: G, clock: C) -> Self {
        Self {
            topics: SheetTopicRepo::new(sheet.clone()),
            votes: SheetVoteRepo::new(sheet),
            clock,
        }
    }
}

impl<G: SheetGateway, C: Clock> VotingEngine for SheetEngine<G, C> {
    type Topics = SheetTopicRepo<G>;
    type Votes = SheetVoteRepo<G>;
    type Clock = C;

    fn topics(&self) -> Self::Topics {
        self.topics.clone()
    }

    fn votes(&self) -> Self::Votes {
        self.votes.clone()
    }

    fn clock(&self) -> Self::Clock {
        self.clock.clone()
    }
}
