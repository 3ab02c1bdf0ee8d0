use crate::aggregator::{DailyTemperatureRange, WindowConditions};
use crate::models::{Device, RiskAssessment, SensorRecord};
use crate::{fungal, pest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Presentation tier for a 0-100 risk value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneColor {
    Green,
    Yellow,
    Red,
}

impl ZoneColor {
    pub fn hex(&self) -> &'static str {
        match self {
            ZoneColor::Green => "#22c55e",
            ZoneColor::Yellow => "#facc15",
            ZoneColor::Red => "#ef4444",
        }
    }
}

pub fn zone_color(value: i32) -> ZoneColor {
    if value <= 40 {
        ZoneColor::Green
    } else if value <= 70 {
        ZoneColor::Yellow
    } else {
        ZoneColor::Red
    }
}

pub fn fungal_assessments(conditions: &WindowConditions) -> Vec<RiskAssessment> {
    let t = conditions.temperature;
    let w = conditions.wetness;

    vec![
        fungal::apple_scab(t, w),
        fungal::alternaria_blotch(t, w),
        fungal::marssonina_blotch(t, w),
        fungal::powdery_mildew(t, conditions.humidity),
        fungal::cedar_apple_rust(t, w),
        fungal::black_rot(t, w),
        fungal::bitter_rot(t, w),
    ]
}

pub fn degree_day_assessments(days: &[DailyTemperatureRange]) -> Vec<RiskAssessment> {
    [pest::CODLING_MOTH, pest::APPLE_MAGGOT, pest::SAN_JOSE_SCALE]
        .iter()
        .map(|model| model.evaluate(model.threshold.accumulate(days)))
        .collect()
}

pub fn reading_assessments(latest: &SensorRecord) -> Vec<RiskAssessment> {
    vec![
        pest::aphids(latest.temperature, latest.humidity),
        pest::spider_mites(latest.temperature, latest.humidity),
    ]
}

/// Combine every model's output in display order: fungal diseases, then
/// degree-day pests, then reading-driven pests. Families with no input are
/// left out.
pub fn assemble(
    conditions: Option<&WindowConditions>,
    days: &[DailyTemperatureRange],
    latest: Option<&SensorRecord>,
) -> Vec<RiskAssessment> {
    let mut assessments = Vec::new();

    if let Some(conditions) = conditions {
        assessments.extend(fungal_assessments(conditions));
    }
    if !days.is_empty() {
        assessments.extend(degree_day_assessments(days));
    }
    if let Some(latest) = latest {
        assessments.extend(reading_assessments(latest));
    }

    assessments
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceReport {
    pub device_id: String,
    pub device_name: String,
    pub generated_at: DateTime<Utc>,
    pub assessments: Vec<RiskAssessment>,
}

impl DeviceReport {
    pub fn new(device: &Device, now: DateTime<Utc>, assessments: Vec<RiskAssessment>) -> Self {
        Self {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            generated_at: now,
            assessments,
        }
    }

    pub fn highest(&self) -> Option<&RiskAssessment> {
        self.assessments.iter().max_by_key(|a| a.value)
    }
}
