use crate::error::{LifecycleError, VoteError};
use error_stack::Report;

pub type VoteResult<T> = Result<T, Report<VoteError>>;
pub type LifecycleResult<T> = Result<T, Report<LifecycleError>>;
pub type OptLifecycleResult<T> = Result<Option<T>, Report<LifecycleError>>;

pub mod error;
pub mod locks;
mod metrics;
pub mod routes;
pub mod service;
pub mod state;
pub mod user;

#[cfg(test)]
mod tests;
