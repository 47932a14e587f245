use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::ValidationError;

const ISO_DATE: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");
const SQL_TIMESTAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_iso_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_iso_date(date: Date) -> String {
    date.format(ISO_DATE)
        .unwrap_or_else(|_| date.to_string())
}

/// Current UTC calendar day.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Current UTC instant truncated to whole seconds, as a SQL timestamp literal.
pub fn now_sql_timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    let naive = PrimitiveDateTime::new(now.date(), now.time());
    naive
        .format(SQL_TIMESTAMP)
        .unwrap_or_else(|_| naive.to_string())
}

/// Calendar day in the exchange's local time for a unix timestamp.
pub fn exchange_date(unix_seconds: i64, gmt_offset_seconds: i32) -> Option<Date> {
    let offset = UtcOffset::from_whole_seconds(gmt_offset_seconds).ok()?;
    let instant = OffsetDateTime::from_unix_timestamp(unix_seconds).ok()?;
    Some(instant.to_offset(offset).date())
}

/// Unix timestamp of midnight UTC at the start of `date`.
pub fn unix_midnight(date: Date) -> i64 {
    date.midnight().assume_utc().unix_timestamp()
}
