//! Timestamp normalization for migrated complaints.
//!
//! SQLite has no datetime type, so `date_posted` may hold epoch numbers,
//! ISO-8601 text, arbitrary text, or nothing. Each value is classified into a
//! [`NormalizedTimestamp`] before it is written.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

use super::source::{RawTimestamp, SourceComplaint};

/// Outcome of classifying one raw timestamp.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedTimestamp {
    Parsed(NaiveDateTime),
    /// Non ISO text, handed to the destination for its own coercion.
    Deferred(String),
    Null,
    /// The value could not be interpreted; written as null.
    Failed { reason: String },
}

impl NormalizedTimestamp {
    /// Value written to the destination when no coercion is needed.
    #[must_use]
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Parsed(dt) => Some(*dt),
            _ => None,
        }
    }
}

/// A complaint ready for the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetComplaint {
    pub id: i32,
    pub name: Option<String>,
    pub content: Option<String>,
    pub date_posted: NormalizedTimestamp,
}

#[must_use]
pub fn transform_complaint(row: SourceComplaint) -> TargetComplaint {
    let date_posted = normalize_timestamp(&row.date_posted);

    TargetComplaint {
        id: row.id,
        name: row.name,
        content: row.content,
        date_posted,
    }
}

/// First match wins: numbers are epoch seconds, text is tried as ISO-8601
/// and otherwise deferred, blank or null becomes null.
#[must_use]
pub fn normalize_timestamp(raw: &RawTimestamp) -> NormalizedTimestamp {
    match raw {
        RawTimestamp::Integer(secs) => match from_epoch_seconds(*secs, 0) {
            Some(dt) => NormalizedTimestamp::Parsed(dt),
            None => NormalizedTimestamp::Failed {
                reason: format!("epoch {secs} is out of range"),
            },
        },
        RawTimestamp::Real(secs) => from_epoch_float(*secs),
        RawTimestamp::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                NormalizedTimestamp::Null
            } else if let Some(dt) = parse_iso8601(trimmed) {
                NormalizedTimestamp::Parsed(dt)
            } else {
                NormalizedTimestamp::Deferred(text.clone())
            }
        }
        RawTimestamp::Null => NormalizedTimestamp::Null,
        RawTimestamp::Unsupported(kind) => NormalizedTimestamp::Failed {
            reason: format!("unsupported storage class '{kind}'"),
        },
    }
}

fn from_epoch_float(secs: f64) -> NormalizedTimestamp {
    if !secs.is_finite() {
        return NormalizedTimestamp::Failed {
            reason: format!("epoch {secs} is not a finite number"),
        };
    }

    // Microsecond precision, rounded to nearest.
    let total_micros = (secs * 1_000_000.0).round();
    if total_micros.abs() >= i64::MAX as f64 {
        return NormalizedTimestamp::Failed {
            reason: format!("epoch {secs} is out of range"),
        };
    }

    let total_micros = total_micros as i64;
    let whole = total_micros.div_euclid(1_000_000);
    let micros = total_micros.rem_euclid(1_000_000) as u32;

    match from_epoch_seconds(whole, micros * 1_000) {
        Some(dt) => NormalizedTimestamp::Parsed(dt),
        None => NormalizedTimestamp::Failed {
            reason: format!("epoch {secs} is out of range"),
        },
    }
}

/// Local wall-clock time for an epoch instant. Ambiguous local times (DST
/// fold) resolve to the earlier one.
fn from_epoch_seconds(secs: i64, nanos: u32) -> Option<NaiveDateTime> {
    Local
        .timestamp_opt(secs, nanos)
        .earliest()
        .map(|dt| dt.naive_local())
}

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Strict ISO-8601 parse. Offset-bearing values are converted to local time.
#[must_use]
pub fn parse_iso8601(text: &str) -> Option<NaiveDateTime> {
    let zulu;
    let text = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        Some(rest) => {
            zulu = format!("{rest}+00:00");
            zulu.as_str()
        }
        None => text,
    };

    if let Some(dt) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt);
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Timelike, Utc};

    fn local_epoch(secs: i64) -> NaiveDateTime {
        Local.timestamp_opt(secs, 0).earliest().unwrap().naive_local()
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_integer_epoch() {
        let normalized = normalize_timestamp(&RawTimestamp::Integer(1_700_000_000));
        assert_eq!(normalized, NormalizedTimestamp::Parsed(local_epoch(1_700_000_000)));
    }

    #[test]
    fn test_real_epoch_keeps_microseconds() {
        let normalized = normalize_timestamp(&RawTimestamp::Real(1_700_000_000.25));
        let expected = local_epoch(1_700_000_000).with_nanosecond(250_000_000).unwrap();
        assert_eq!(normalized, NormalizedTimestamp::Parsed(expected));
    }

    #[test]
    fn test_negative_real_epoch() {
        let normalized = normalize_timestamp(&RawTimestamp::Real(-1.5));
        let expected = local_epoch(-2).with_nanosecond(500_000_000).unwrap();
        assert_eq!(normalized, NormalizedTimestamp::Parsed(expected));
    }

    #[test]
    fn test_non_finite_epoch_fails() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                normalize_timestamp(&RawTimestamp::Real(value)),
                NormalizedTimestamp::Failed { .. }
            ));
        }
    }

    #[test]
    fn test_out_of_range_epoch_fails() {
        assert!(matches!(
            normalize_timestamp(&RawTimestamp::Integer(i64::MAX)),
            NormalizedTimestamp::Failed { .. }
        ));
        assert!(matches!(
            normalize_timestamp(&RawTimestamp::Real(1e300)),
            NormalizedTimestamp::Failed { .. }
        ));
    }

    #[test]
    fn test_iso_text_round_trips() {
        for (raw, expected) in [
            ("2024-03-01 10:20:30.123456", "2024-03-01 10:20:30.123456"),
            ("2024-03-01T10:20:30", "2024-03-01 10:20:30"),
            ("2024-03-01 10:20", "2024-03-01 10:20:00"),
            ("2024-03-01", "2024-03-01 00:00:00"),
            ("  2024-03-01T10:20:30.5  ", "2024-03-01 10:20:30.5"),
        ] {
            assert_eq!(
                normalize_timestamp(&RawTimestamp::Text(raw.to_string())),
                NormalizedTimestamp::Parsed(naive(expected)),
                "input {raw:?}"
            );
        }
    }

    #[test]
    fn test_iso_text_with_offset_converts_to_local() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let expected = instant.with_timezone(&Local).naive_local();

        for raw in [
            "2024-03-01T10:00:00Z",
            "2024-03-01T12:00:00+02:00",
            "2024-03-01 05:00:00-0500",
        ] {
            assert_eq!(parse_iso8601(raw), Some(expected), "input {raw:?}");
        }
    }

    #[test]
    fn test_free_text_is_deferred() {
        let raw = "March 1st, 2024".to_string();
        assert_eq!(
            normalize_timestamp(&RawTimestamp::Text(raw.clone())),
            NormalizedTimestamp::Deferred(raw)
        );
        assert_eq!(parse_iso8601("2024-02-30 10:00:00"), None);
        assert_eq!(parse_iso8601("2024-03-01 10:00:00 trailing"), None);
    }

    #[test]
    fn test_blank_or_missing_is_null() {
        assert_eq!(
            normalize_timestamp(&RawTimestamp::Text("   ".to_string())),
            NormalizedTimestamp::Null
        );
        assert_eq!(
            normalize_timestamp(&RawTimestamp::Text(String::new())),
            NormalizedTimestamp::Null
        );
        assert_eq!(normalize_timestamp(&RawTimestamp::Null), NormalizedTimestamp::Null);
    }

    #[test]
    fn test_blob_fails_without_aborting() {
        let normalized = normalize_timestamp(&RawTimestamp::Unsupported("blob".to_string()));
        assert!(matches!(normalized, NormalizedTimestamp::Failed { .. }));
        assert_eq!(normalized.as_datetime(), None);
    }

    #[test]
    fn test_transform_keeps_identity() {
        let row = SourceComplaint {
            id: 42,
            name: Some("Anonymous".to_string()),
            content: Some("The lift is broken".to_string()),
            date_posted: RawTimestamp::Null,
        };

        let target = transform_complaint(row);
        assert_eq!(target.id, 42);
        assert_eq!(target.name.as_deref(), Some("Anonymous"));
        assert_eq!(target.content.as_deref(), Some("The lift is broken"));
        assert_eq!(target.date_posted, NormalizedTimestamp::Null);
    }
}
