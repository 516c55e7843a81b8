use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, SubsecRound, TimeDelta, TimeZone, Timelike, Utc,
};
use error_stack::{Report, ResultExt};

/// Every instant the service deals with, expressed in the storage offset.
pub type Timestamp = DateTime<FixedOffset>;

/// Stored timestamps are recorded at UTC+9.
pub const STORAGE_OFFSET_SECONDS: i32 = 9 * 60 * 60;

pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";
pub const DEADLINE_DATE_FORMAT: &str = "%Y-%m-%d";
pub const RECORDED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
#[error("'{0}' is not a valid timestamp")]
pub struct TimeFormatError(String);

pub fn storage_offset() -> FixedOffset {
    FixedOffset::east_opt(STORAGE_OFFSET_SECONDS).expect("UTC+9 is a valid fixed offset")
}

pub trait Clock: Clone + Send + Sync + 'static {
    fn now(&self) -> Timestamp;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().with_timezone(&storage_offset())
    }
}

/// Drop sub-second precision so a value survives a trip through storage unchanged.
pub fn to_storage_precision(timestamp: Timestamp) -> Timestamp {
    timestamp.trunc_subsecs(0).with_timezone(&storage_offset())
}

/// Deadlines are stored to the minute.
pub fn to_deadline_precision(timestamp: Timestamp) -> Timestamp {
    let truncated = to_storage_precision(timestamp);
    truncated - TimeDelta::seconds(i64::from(truncated.second()))
}

/// Parse a deadline cell or request value.
///
/// An empty value means the topic has no deadline. A bare date is read as the last minute of
/// that day, so a topic due "2025-01-31" still accepts votes during the 31st.
pub fn parse_deadline(raw: &str) -> Result<Option<Timestamp>, Report<TimeFormatError>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }

    let naive = match NaiveDateTime::parse_from_str(raw, DEADLINE_FORMAT) {
        Ok(naive) => naive,
        Err(_) => NaiveDate::parse_from_str(raw, DEADLINE_DATE_FORMAT)
            .change_context_lazy(|| TimeFormatError(raw.to_string()))?
            .and_hms_opt(23, 59, 0)
            .ok_or_else(|| Report::new(TimeFormatError(raw.to_string())))?,
    };

    localize(naive, raw).map(Some)
}

pub fn format_deadline(deadline: &Timestamp) -> String {
    deadline
        .with_timezone(&storage_offset())
        .format(DEADLINE_FORMAT)
        .to_string()
}

pub fn parse_recorded_at(raw: &str) -> Result<Timestamp, Report<TimeFormatError>> {
    let raw = raw.trim();
    let naive = NaiveDateTime::parse_from_str(raw, RECORDED_AT_FORMAT)
        .change_context_lazy(|| TimeFormatError(raw.to_string()))?;
    localize(naive, raw)
}

pub fn format_recorded_at(timestamp: &Timestamp) -> String {
    timestamp
        .with_timezone(&storage_offset())
        .format(RECORDED_AT_FORMAT)
        .to_string()
}

fn localize(naive: NaiveDateTime, raw: &str) -> Result<Timestamp, Report<TimeFormatError>> {
    storage_offset()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| Report::new(TimeFormatError(raw.to_string())))
}
