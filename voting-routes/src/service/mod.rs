mod lifecycle;
mod voting;

pub use lifecycle::{DEFAULT_TOPIC_PAGE_SIZE, DeleteMode, TopicService};
pub use voting::VoteService;
