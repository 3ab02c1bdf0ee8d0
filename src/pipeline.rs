use crate::aggregator::{aggregate_daily, average_conditions, latest_reading, within_window};
use crate::config::EvaluationConfig;
use crate::error::Result;
use crate::models::{RawRecord, RiskAssessment, SensorRecord};
use crate::normalizer::{Normalizer, TimestampPolicy};
use crate::report::assemble;
use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

/// Runs every model over one device's readings.
///
/// Evaluation is a pure function of the readings and `now`; nothing is
/// cached between calls.
#[derive(Debug, Clone)]
pub struct Evaluator {
    offset: FixedOffset,
    wetness_window_days: Option<u32>,
    degree_day_window_days: Option<u32>,
}

impl Evaluator {
    pub fn new(config: &EvaluationConfig) -> Result<Self> {
        Ok(Self {
            offset: config.offset()?,
            wetness_window_days: config.wetness_window_days,
            degree_day_window_days: config.degree_day_window_days,
        })
    }

    pub fn timestamp_policy(&self) -> TimestampPolicy {
        if self.wetness_window_days.is_some() || self.degree_day_window_days.is_some() {
            TimestampPolicy::Required
        } else {
            TimestampPolicy::Lenient
        }
    }

    pub fn evaluate(&self, records: &[SensorRecord], now: DateTime<Utc>) -> Vec<RiskAssessment> {
        if records.is_empty() {
            return Vec::new();
        }

        let wetness_records = windowed(records, now, self.wetness_window_days);
        let degree_day_records = windowed(records, now, self.degree_day_window_days);

        if wetness_records.is_empty() && degree_day_records.is_empty() {
            debug!("No readings inside either evaluation window");
            return Vec::new();
        }

        let conditions = average_conditions(&wetness_records);
        let days = aggregate_daily(&degree_day_records, self.offset);
        let latest = latest_reading(records);

        debug!(
            "Evaluating {} readings: {} in wetness window, {} days for degree-days",
            records.len(),
            wetness_records.len(),
            days.len()
        );

        assemble(conditions.as_ref(), &days, latest)
    }

    pub fn evaluate_raw(&self, raws: &[RawRecord], now: DateTime<Utc>) -> Result<Vec<RiskAssessment>> {
        let (records, _stats) = Normalizer::normalize(raws, self.timestamp_policy())?;
        Ok(self.evaluate(&records, now))
    }
}

fn windowed(records: &[SensorRecord], now: DateTime<Utc>, days: Option<u32>) -> Vec<SensorRecord> {
    match days {
        Some(days) => within_window(records, now, days),
        None => records.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RiskStatus;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn evaluator(wetness: Option<u32>, degree_days: Option<u32>) -> Evaluator {
        Evaluator::new(&EvaluationConfig {
            utc_offset_minutes: 0,
            wetness_window_days: wetness,
            degree_day_window_days: degree_days,
        })
        .unwrap()
    }

    #[test]
    fn test_empty_input_yields_empty_result() {
        assert!(evaluator(Some(7), None).evaluate(&[], now()).is_empty());
    }

    #[test]
    fn test_readings_outside_wetness_window_skip_fungal_models() {
        let old = SensorRecord::new(now() - Duration::days(20), 20.0, 80.0, 9.0);

        let risks = evaluator(Some(7), None).evaluate(&[old], now());

        // only pests remain
        assert_eq!(risks.len(), 5);
        assert_eq!(risks[0].name, "Codling Moth");
    }

    #[test]
    fn test_wetness_window_limits_averaging() {
        let records = vec![
            SensorRecord::new(now() - Duration::days(30), 5.0, 10.0, 0.0),
            SensorRecord::new(now() - Duration::hours(5), 20.0, 80.0, 9.0),
        ];

        let risks = evaluator(Some(7), None).evaluate(&records, now());
        assert_eq!(risks[0].name, "Apple Scab");
        assert_eq!(risks[0].value, 100);
        assert_eq!(risks[0].status, RiskStatus::High);

        let unwindowed = evaluator(None, None).evaluate(&records, now());
        assert_eq!(unwindowed[0].status, RiskStatus::NoRisk);
    }

    #[test]
    fn test_stale_readings_outside_both_windows_yield_empty_result() {
        let stale = SensorRecord::new(now() - Duration::days(300), 25.0, 50.0, 0.0);

        assert!(evaluator(Some(7), Some(120)).evaluate(&[stale], now()).is_empty());
    }

    #[test]
    fn test_latest_reading_drives_instant_pests() {
        let records = vec![
            SensorRecord::new(now() - Duration::hours(1), 30.0, 40.0, 0.0),
            SensorRecord::new(now() - Duration::hours(3), 10.0, 90.0, 0.0),
        ];

        let risks = evaluator(Some(7), None).evaluate(&records, now());
        let mites = risks.iter().find(|r| r.name == "Spider Mites").unwrap();
        assert_eq!(mites.status, RiskStatus::High);
    }

    #[test]
    fn test_timestamp_policy_follows_windows() {
        assert_eq!(evaluator(Some(7), None).timestamp_policy(), TimestampPolicy::Required);
        assert_eq!(evaluator(None, Some(90)).timestamp_policy(), TimestampPolicy::Required);
        assert_eq!(evaluator(None, None).timestamp_policy(), TimestampPolicy::Lenient);
    }

    #[test]
    fn test_evaluation_is_repeatable() {
        let records: Vec<SensorRecord> = (0..48)
            .map(|h| {
                SensorRecord::new(
                    now() - Duration::hours(h),
                    15.0 + (h % 12) as f64,
                    60.0 + (h % 5) as f64 * 5.0,
                    (h % 3) as f64,
                )
            })
            .collect();

        let e = evaluator(Some(7), Some(30));
        assert_eq!(e.evaluate(&records, now()), e.evaluate(&records, now()));
    }
}
