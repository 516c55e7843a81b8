//! Access to the spreadsheet-style tables that hold every topic and vote.
//!
//! A sheet offers nothing beyond plain row operations: no transactions, no uniqueness, no
//! conditional writes. Row indexes are zero-based over data rows (header rows are never
//! exposed) and shift whenever a row is deleted.
use error_stack::Report;
use std::fmt::{Display, Formatter};

pub mod http;
pub mod memory;
pub mod resilient;

pub use http::HttpSheet;
pub use memory::MemorySheet;
pub use resilient::{ResilientSheet, RetryPolicy};

pub type Row = Vec<String>;
pub type GatewayResult<T> = Result<T, Report<GatewayError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Topics,
    Votes,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Topics => "topics",
            Table::Votes => "votes",
        }
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum GatewayError {
    /// The request never reached the sheet: connection refused or throttled.
    #[error("the sheet service is unavailable")]
    Unavailable,
    /// The request was sent but failed without a usable answer, for example a server error or a
    /// dropped connection. The request may or may not have been applied.
    #[error("the sheet service failed while handling the request")]
    Interrupted,
    /// No answer arrived in time. The request may or may not have been applied.
    #[error("the sheet service did not answer in time")]
    TimedOut,
    #[error("the sheet service rejected the request")]
    Rejected,
    #[error("the sheet service returned a malformed response")]
    Malformed,
}

pub trait SheetGateway: Clone + Send + Sync + 'static {
    fn read_rows(&self, table: Table) -> impl Future<Output = GatewayResult<Vec<Row>>> + Send;

    fn append_row(&self, table: Table, row: Row) -> impl Future<Output = GatewayResult<()>> + Send;

    fn update_cell(
        &self,
        table: Table,
        row: usize,
        column: usize,
        value: String,
    ) -> impl Future<Output = GatewayResult<()>> + Send;

    fn delete_row(&self, table: Table, row: usize)
    -> impl Future<Output = GatewayResult<()>> + Send;
}
