use crate::error::{AppError, Result};
use crate::models::{RawRecord, RawValue, SensorRecord};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// Epoch values above this are taken to be milliseconds
const EPOCH_MILLIS_CUTOFF: f64 = 1.0e11;

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// What to do with a record whose timestamp cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Fail the batch; used when records will be grouped by day.
    Required,
    /// Keep the record with no timestamp.
    Lenient,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeStats {
    pub total_records: usize,
    pub coerced_fields: usize,
    pub missing_timestamps: usize,
}

impl NormalizeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_clean(&self) -> bool {
        self.coerced_fields == 0 && self.missing_timestamps == 0
    }
}

pub struct Normalizer;

impl Normalizer {
    /// Coerce provider records into typed readings.
    ///
    /// Numeric fields that are absent or unreadable become 0 so a single bad
    /// reading never blocks an evaluation; unreadable values are counted and
    /// logged. Timestamps are handled according to `policy`.
    pub fn normalize(
        raws: &[RawRecord],
        policy: TimestampPolicy,
    ) -> Result<(Vec<SensorRecord>, NormalizeStats)> {
        let mut records = Vec::with_capacity(raws.len());
        let mut stats = NormalizeStats::new();

        for (index, raw) in raws.iter().enumerate() {
            stats.total_records += 1;

            let timestamp = match raw.timestamp.as_ref().map(parse_timestamp) {
                Some(Ok(ts)) => Some(ts),
                Some(Err(_)) | None if policy == TimestampPolicy::Lenient => {
                    stats.missing_timestamps += 1;
                    None
                }
                Some(Err(reason)) => {
                    return Err(AppError::MalformedRecord { index, reason });
                }
                None => {
                    return Err(AppError::MalformedRecord {
                        index,
                        reason: "timestamp is missing".to_string(),
                    });
                }
            };

            let temperature = coerce_field(index, "temp", raw.temp.as_ref(), &mut stats);
            let humidity = coerce_field(index, "humidity", raw.humidity.as_ref(), &mut stats);
            let wetness = coerce_field(index, "rainfall", raw.rainfall.as_ref(), &mut stats);

            records.push(SensorRecord {
                timestamp,
                temperature,
                humidity,
                wetness,
            });
        }

        if stats.missing_timestamps > 0 {
            warn!(
                "{} of {} records have no readable timestamp",
                stats.missing_timestamps, stats.total_records
            );
        }

        Ok((records, stats))
    }
}

fn coerce_field(
    index: usize,
    field: &str,
    value: Option<&RawValue>,
    stats: &mut NormalizeStats,
) -> f64 {
    match value {
        None => 0.0,
        Some(value) => match parse_number(value) {
            Some(n) => n,
            None => {
                stats.coerced_fields += 1;
                warn!(
                    "Record {}: unreadable {} value {:?}, using 0",
                    index, field, value
                );
                0.0
            }
        },
    }
}

/// Empty strings count as absent, not unreadable.
fn parse_number(value: &RawValue) -> Option<f64> {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Text(s) if s.trim().is_empty() => return Some(0.0),
        RawValue::Text(s) => s.trim().parse::<f64>().ok()?,
        RawValue::Flag(_) | RawValue::Unsupported(_) => return None,
    };

    n.is_finite().then_some(n)
}

fn parse_timestamp(value: &RawValue) -> std::result::Result<DateTime<Utc>, String> {
    match value {
        RawValue::Number(n) => parse_epoch(*n),
        RawValue::Text(s) => parse_timestamp_str(s.trim()),
        other => Err(format!("unsupported timestamp value {:?}", other)),
    }
}

fn parse_timestamp_str(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if s.is_empty() {
        return Err("timestamp is empty".to_string());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    if let Ok(n) = s.parse::<f64>() {
        return parse_epoch(n);
    }

    Err(format!("unrecognized timestamp '{}'", s))
}

fn parse_epoch(n: f64) -> std::result::Result<DateTime<Utc>, String> {
    if !n.is_finite() || n < 0.0 {
        return Err(format!("epoch value {} out of range", n));
    }

    let millis = if n > EPOCH_MILLIS_CUTOFF { n } else { n * 1000.0 };

    DateTime::from_timestamp_millis(millis as i64)
        .ok_or_else(|| format!("epoch value {} out of range", n))
}
