//! Field coercion: raw source text into typed values.
//!
//! Every function here is pure and total: the same input always yields
//! the same output, malformed input yields `None`, and nothing panics.
//! Date parts are interpreted as UTC-naive; there is no locale or
//! timezone dependence.

use chrono::NaiveDate;

/// Parse a `DD/MM/YYYY` date.
///
/// Returns `None` for empty input, the wrong number of `/`-separated
/// parts, non-numeric parts, or an impossible calendar date.
#[must_use]
pub fn date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut parts = raw.split('/');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a `DD/MM/YYYY` date plus optional `HH:MM` time into
/// milliseconds since the Unix epoch.
///
/// Missing or `:`-less time defaults to `00:00`; an empty hour or
/// minute part reads as zero. Any non-numeric component or invalid
/// clock value yields `None`.
#[must_use]
pub fn timestamp_millis(date_raw: Option<&str>, time_raw: Option<&str>) -> Option<i64> {
    let d = date(date_raw)?;

    let (hour, minute) = match time_raw {
        Some(t) if t.contains(':') => {
            let t = t.trim();
            let mut parts = t.split(':');
            let h = parts.next().unwrap_or("");
            let m = parts.next().unwrap_or("");
            let hour: u32 = if h.is_empty() { 0 } else { h.trim().parse().ok()? };
            let minute: u32 = if m.is_empty() { 0 } else { m.trim().parse().ok()? };
            (hour, minute)
        }
        _ => (0, 0),
    };

    let dt = d.and_hms_opt(hour, minute, 0)?;
    Some(dt.and_utc().timestamp_millis())
}

/// Parse an integer, `None` on empty or non-numeric text.
#[must_use]
pub fn int(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

/// Parse a float, `None` on empty or non-numeric text.
#[must_use]
pub fn float(raw: Option<&str>) -> Option<f64> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

/// Trim whitespace, `None` for an empty result.
#[must_use]
pub fn trimmed(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    Some(raw.to_string())
}

/// Normalize line endings and trim, keeping internal formatting.
///
/// `\r\n` and bare `\r` become `\n` so multi-line clinical notes keep
/// their paragraph breaks verbatim across platforms. `None` for an
/// empty result.
#[must_use]
pub fn preserved(raw: Option<&str>) -> Option<String> {
    let text = raw?.replace("\r\n", "\n").replace('\r', "\n");
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.to_string())
}
