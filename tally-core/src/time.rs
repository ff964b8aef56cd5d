//! Time utilities: timezone-aware "today" and Retry-After parsing.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::error::{Error, Result};

pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.parse()
        .map_err(|_| Error::InvalidTimezone(tz.to_string()))
}

/// The calendar date at `now` in the given IANA timezone.
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Today in the given IANA timezone, e.g. "America/Chicago".
pub fn today_in(tz: &str) -> Result<NaiveDate> {
    Ok(local_date(Utc::now(), parse_timezone(tz)?))
}

/// Longest cooldown honoured, in seconds
pub const MAX_RETRY_AFTER_SECS: u64 = 86_400;

/// Seconds to wait according to a `Retry-After` value: delta-seconds or an HTTP date.
/// Capped at `MAX_RETRY_AFTER_SECS`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<u64> {
    let value = value.trim();
    let secs = match value.parse::<u64>() {
        Ok(secs) => secs,
        Err(_) => {
            let at = DateTime::parse_from_rfc2822(value).ok()?;
            let wait = at.with_timezone(&Utc) - now;
            wait.num_seconds().max(0) as u64
        }
    };
    Some(secs.min(MAX_RETRY_AFTER_SECS))
}
