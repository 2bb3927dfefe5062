use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer};

/// Parse a calendar date from the formats found in place datasets.
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (date part only) and `DD/MM/YYYY`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%d/%m/%Y") {
        return Some(date);
    }
    // Timestamps without offset, e.g. "1861-03-17T00:00:00"
    if value.len() > 10 && value.is_char_boundary(10) {
        return NaiveDate::parse_from_str(&value[..10], "%Y-%m-%d").ok();
    }
    None
}

/// Current local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Serde helper for optional multi-format dates.
/// Missing, `null` and empty strings all become `None`.
pub fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_date(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s))),
    }
}
