pub mod app;
pub mod error;
mod pagination;
pub use pagination::Pagination;
pub mod stream;
