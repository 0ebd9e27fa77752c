//! Date handling for lock timestamps

use chrono::{DateTime, NaiveDate, Utc};
use qanx_core::Timestamp;

use crate::error::{CliError, Result};

/// Parse `YYYY-MM-DD` (UTC midnight) or a raw UNIX timestamp
pub fn parse_time(value: &str) -> Result<Timestamp> {
    let value = value.trim();
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        return value
            .parse()
            .map_err(|_| CliError::InvalidTime(value.to_string()));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| CliError::InvalidTime(format!("{}: {}", value, e)))?;
    let seconds = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidTime(value.to_string()))?
        .and_utc()
        .timestamp();
    Timestamp::try_from(seconds).map_err(|_| CliError::InvalidTime(value.to_string()))
}

/// Optional lock date, 0 when absent
pub fn parse_optional_time(value: Option<&str>) -> Result<Timestamp> {
    value.map_or(Ok(0), parse_time)
}

pub fn current_timestamp() -> Timestamp {
    Utc::now().timestamp().max(0) as Timestamp
}

pub fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_is_utc_midnight() {
        assert_eq!(parse_time("2021-01-01").unwrap(), 1_609_459_200);
        assert_eq!(parse_time("1970-01-01").unwrap(), 0);
    }

    #[test]
    fn test_parse_raw_timestamp() {
        assert_eq!(parse_time("1700000000").unwrap(), 1_700_000_000);
    }

    #[test]
    fn test_rejects_garbage_and_pre_epoch() {
        assert!(parse_time("2021-13-01").is_err());
        assert!(parse_time("tomorrow").is_err());
        assert!(parse_time("1969-12-31").is_err());
        assert_eq!(parse_optional_time(None).unwrap(), 0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(1_609_459_200), "2021-01-01 00:00:00 UTC");
    }
}
