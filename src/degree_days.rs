//! Degree-day accumulation using the simple-average method with a horizontal
//! upper cutoff.

use crate::aggregator::DailyTemperatureRange;

/// Developmental thresholds for one species, in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeDayThreshold {
    pub species: &'static str,
    pub lower: f64,
    pub upper: f64,
}

impl DegreeDayThreshold {
    pub fn accumulate(&self, days: &[DailyTemperatureRange]) -> f64 {
        accumulate(days, self.lower, self.upper)
    }
}

/// Heat units contributed by a single day.
///
/// Days averaging at or below `lower` add nothing; above `upper` the day is
/// capped at `upper - lower`.
pub fn daily_contribution(day: &DailyTemperatureRange, lower: f64, upper: f64) -> f64 {
    let avg = day.mean();

    if avg <= lower {
        0.0
    } else if avg <= upper {
        avg - lower
    } else {
        upper - lower
    }
}

pub fn accumulate(days: &[DailyTemperatureRange], lower: f64, upper: f64) -> f64 {
    days.iter()
        .map(|day| daily_contribution(day, lower, upper))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(n: u32, min: f64, max: f64) -> DailyTemperatureRange {
        DailyTemperatureRange {
            date: NaiveDate::from_ymd_opt(2024, 5, n).unwrap(),
            min,
            max,
        }
    }

    #[test]
    fn test_empty_accumulates_zero() {
        assert_eq!(accumulate(&[], 10.0, 31.0), 0.0);
    }

    #[test]
    fn test_contribution_bands() {
        // avg 8 <= lower
        assert_eq!(daily_contribution(&day(1, 4.0, 12.0), 10.0, 31.0), 0.0);
        // avg exactly lower
        assert_eq!(daily_contribution(&day(1, 6.0, 14.0), 10.0, 31.0), 0.0);
        // avg 20 between thresholds
        assert_eq!(daily_contribution(&day(1, 14.0, 26.0), 10.0, 31.0), 10.0);
        // avg exactly upper
        assert_eq!(daily_contribution(&day(1, 30.0, 32.0), 10.0, 31.0), 21.0);
        // avg 35 capped
        assert_eq!(daily_contribution(&day(1, 30.0, 40.0), 10.0, 31.0), 21.0);
    }

    #[test]
    fn test_accumulate_sums_days() {
        let days = vec![day(1, 14.0, 26.0), day(2, 10.0, 20.0), day(3, 2.0, 8.0)];
        assert_eq!(accumulate(&days, 10.0, 31.0), 15.0);
    }

    #[test]
    fn test_accumulation_is_monotonic() {
        let days: Vec<DailyTemperatureRange> = (1..=28)
            .map(|n| {
                let base = (n as f64 * 7.3) % 30.0 - 5.0;
                day(n, base, base + (n % 9) as f64 + 3.0)
            })
            .collect();

        let mut previous = 0.0;
        for end in 0..=days.len() {
            let total = accumulate(&days[..end], 10.0, 31.1);
            assert!(total >= previous, "total dropped at day {}", end);
            previous = total;
        }
    }

    #[test]
    fn test_threshold_accumulate() {
        let threshold = DegreeDayThreshold {
            species: "Test",
            lower: 10.0,
            upper: 20.0,
        };
        let days = vec![day(1, 20.0, 30.0), day(2, 12.0, 16.0)];
        assert_eq!(threshold.accumulate(&days), 14.0);
    }
}
