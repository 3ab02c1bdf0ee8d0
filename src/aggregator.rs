use crate::models::SensorRecord;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyTemperatureRange {
    pub date: NaiveDate,
    pub min: f64,
    pub max: f64,
}

impl DailyTemperatureRange {
    /// Simple-average daily mean used by the degree-day engine
    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Mean conditions over an evaluation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub wetness: f64,
    pub samples: usize,
}

/// Group readings by calendar day in `offset` and keep each day's extremes.
///
/// Days appear in the order they are first seen, which need not be
/// chronological. Readings without a timestamp cannot be placed on a day and
/// are skipped.
pub fn aggregate_daily(records: &[SensorRecord], offset: FixedOffset) -> Vec<DailyTemperatureRange> {
    let mut days: Vec<DailyTemperatureRange> = Vec::new();
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(timestamp) = record.timestamp else {
            skipped += 1;
            continue;
        };

        let date = timestamp.with_timezone(&offset).date_naive();
        let t = record.temperature;

        match index.get(&date) {
            Some(&i) => {
                let day = &mut days[i];
                day.min = day.min.min(t);
                day.max = day.max.max(t);
            }
            None => {
                index.insert(date, days.len());
                days.push(DailyTemperatureRange {
                    date,
                    min: t,
                    max: t,
                });
            }
        }
    }

    if skipped > 0 {
        debug!("Skipped {} readings without timestamp during daily aggregation", skipped);
    }

    days
}

pub fn average_conditions(records: &[SensorRecord]) -> Option<WindowConditions> {
    if records.is_empty() {
        return None;
    }

    let n = records.len() as f64;
    let (t, h, w) = records.iter().fold((0.0, 0.0, 0.0), |(t, h, w), r| {
        (t + r.temperature, h + r.humidity, w + r.wetness)
    });

    Some(WindowConditions {
        temperature: t / n,
        humidity: h / n,
        wetness: w / n,
        samples: records.len(),
    })
}

/// The most recent reading. Falls back to input order when no reading
/// carries a timestamp; ties go to the later reading.
pub fn latest_reading(records: &[SensorRecord]) -> Option<&SensorRecord> {
    let timestamped = records
        .iter()
        .filter(|r| r.timestamp.is_some())
        .max_by_key(|r| r.timestamp);

    timestamped.or_else(|| records.last())
}

/// Readings taken in the `days` before `now` (exclusive start, inclusive
/// end). Readings without a timestamp are kept.
///
/// A window reaching past the earliest representable instant has no start.
pub fn within_window(records: &[SensorRecord], now: DateTime<Utc>, days: u32) -> Vec<SensorRecord> {
    let start = Duration::try_days(i64::from(days)).and_then(|span| now.checked_sub_signed(span));

    records
        .iter()
        .filter(|r| match r.timestamp {
            Some(ts) => start.map_or(true, |start| ts > start) && ts <= now,
            None => true,
        })
        .copied()
        .collect()
}
