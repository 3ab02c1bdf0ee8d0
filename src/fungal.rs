//! Fungal disease risk from window-averaged temperature and a wetness or
//! humidity signal.
//!
//! Every threshold lives in a constant table below. Temperature ranges are
//! inclusive at both ends; the signal comparison is carried by [`Bound`] so
//! each model keeps its own `>=` / `>` boundary.

use crate::models::{RiskAssessment, RiskStatus};
use tracing::debug;

pub const APPLE_SCAB_NAME: &str = "Apple Scab";
pub const ALTERNARIA_BLOTCH_NAME: &str = "Alternaria Blotch";
pub const MARSSONINA_BLOTCH_NAME: &str = "Marssonina Blotch";
pub const POWDERY_MILDEW_NAME: &str = "Powdery Mildew";
pub const CEDAR_APPLE_RUST_NAME: &str = "Cedar-Apple Rust";
pub const BLACK_ROT_NAME: &str = "Black Rot";
pub const BITTER_ROT_NAME: &str = "Bitter Rot";

/// Limit on a secondary signal (wetness hours or humidity).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    AtLeast(f64),
    Above(f64),
    AtMost(f64),
}

impl Bound {
    pub fn admits(&self, value: f64) -> bool {
        match *self {
            Bound::AtLeast(limit) => value >= limit,
            Bound::Above(limit) => value > limit,
            Bound::AtMost(limit) => value <= limit,
        }
    }
}

/// Inclusive temperature range in °C.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

impl TempRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.min && t <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub temperature: TempRange,
    pub signal: Bound,
}

impl Conditions {
    pub fn matches(&self, temperature: f64, signal: f64) -> bool {
        self.temperature.contains(temperature) && self.signal.admits(signal)
    }
}

/// High band checked first, then medium, else no risk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandedModel {
    pub name: &'static str,
    pub high: Conditions,
    pub high_value: i32,
    pub medium: Conditions,
    pub medium_value: i32,
}

impl BandedModel {
    pub fn evaluate(&self, temperature: f64, signal: f64) -> RiskAssessment {
        if self.high.matches(temperature, signal) {
            RiskAssessment::new(self.name, self.high_value, RiskStatus::High)
        } else if self.medium.matches(temperature, signal) {
            RiskAssessment::new(self.name, self.medium_value, RiskStatus::Medium)
        } else {
            RiskAssessment::no_risk(self.name)
        }
    }
}

/// No risk outside the gate; inside it the optimal sub-condition picks
/// between two fixed values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatedModel {
    pub name: &'static str,
    pub gate: Conditions,
    pub optimal: Conditions,
    pub optimal_value: i32,
    pub base_value: i32,
}

impl GatedModel {
    pub fn evaluate(&self, temperature: f64, signal: f64) -> RiskAssessment {
        if !self.gate.matches(temperature, signal) {
            return RiskAssessment::no_risk(self.name);
        }

        let value = if self.optimal.matches(temperature, signal) {
            self.optimal_value
        } else {
            self.base_value
        };

        let status = if value >= HIGH_RISK_CUTOFF {
            RiskStatus::High
        } else {
            RiskStatus::Medium
        };

        RiskAssessment::new(self.name, value, status)
    }
}

pub const HIGH_RISK_CUTOFF: i32 = 70;
pub const MEDIUM_RISK_CUTOFF: i32 = 40;

/// Below this no scab infection is possible.
pub const APPLE_SCAB_MIN_TEMP: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MillsBand {
    pub temperature: TempRange,
    pub required_hours: f64,
}

/// Leaf-wetness hours required for primary scab infection.
pub const MILLS_TABLE: [MillsBand; 7] = [
    MillsBand { temperature: TempRange::new(18.0, 24.0), required_hours: 9.0 },
    MillsBand { temperature: TempRange::new(17.0, 17.0), required_hours: 10.0 },
    MillsBand { temperature: TempRange::new(16.0, 16.0), required_hours: 11.0 },
    MillsBand { temperature: TempRange::new(15.0, 15.0), required_hours: 12.0 },
    MillsBand { temperature: TempRange::new(13.0, 14.0), required_hours: 14.0 },
    MillsBand { temperature: TempRange::new(12.0, 12.0), required_hours: 15.0 },
    MillsBand { temperature: TempRange::new(10.0, 11.0), required_hours: 20.0 },
];

pub const ALTERNARIA_BLOTCH: BandedModel = BandedModel {
    name: ALTERNARIA_BLOTCH_NAME,
    high: Conditions { temperature: TempRange::new(25.0, 30.0), signal: Bound::AtLeast(5.5) },
    high_value: 80,
    medium: Conditions { temperature: TempRange::new(20.0, 32.0), signal: Bound::AtLeast(4.0) },
    medium_value: 50,
};

pub const MARSSONINA_BLOTCH: BandedModel = BandedModel {
    name: MARSSONINA_BLOTCH_NAME,
    high: Conditions { temperature: TempRange::new(20.0, 25.0), signal: Bound::AtLeast(24.0) },
    high_value: 90,
    medium: Conditions { temperature: TempRange::new(16.0, 28.0), signal: Bound::AtLeast(10.0) },
    medium_value: 60,
};

pub const CEDAR_APPLE_RUST: BandedModel = BandedModel {
    name: CEDAR_APPLE_RUST_NAME,
    high: Conditions { temperature: TempRange::new(13.0, 24.0), signal: Bound::AtLeast(4.0) },
    high_value: 75,
    medium: Conditions { temperature: TempRange::new(10.0, 26.0), signal: Bound::AtLeast(2.0) },
    medium_value: 50,
};

pub const BITTER_ROT: BandedModel = BandedModel {
    name: BITTER_ROT_NAME,
    high: Conditions { temperature: TempRange::new(26.0, 32.0), signal: Bound::AtLeast(5.0) },
    high_value: 80,
    medium: Conditions { temperature: TempRange::new(20.0, 35.0), signal: Bound::AtLeast(3.0) },
    medium_value: 50,
};

/// Signal is relative humidity in percent.
pub const POWDERY_MILDEW: GatedModel = GatedModel {
    name: POWDERY_MILDEW_NAME,
    gate: Conditions { temperature: TempRange::new(10.0, 25.0), signal: Bound::AtLeast(70.0) },
    optimal: Conditions { temperature: TempRange::new(19.0, 22.0), signal: Bound::Above(75.0) },
    optimal_value: 90,
    base_value: 60,
};

pub const BLACK_ROT: GatedModel = GatedModel {
    name: BLACK_ROT_NAME,
    gate: Conditions { temperature: TempRange::new(20.0, 35.0), signal: Bound::AtLeast(4.0) },
    optimal: Conditions { temperature: TempRange::new(26.0, 32.0), signal: Bound::AtLeast(6.0) },
    optimal_value: 85,
    base_value: 60,
};

/// Required wetness hours for `temperature`, if the Mills table defines one.
pub fn required_wetness_hours(temperature: f64) -> Option<f64> {
    MILLS_TABLE
        .iter()
        .find(|band| band.temperature.contains(temperature))
        .map(|band| band.required_hours)
}

pub fn apple_scab(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    if temperature < APPLE_SCAB_MIN_TEMP {
        return RiskAssessment::no_risk(APPLE_SCAB_NAME);
    }

    let Some(required) = required_wetness_hours(temperature) else {
        debug!(
            "No Mills table entry for {:.2}°C, reporting no scab risk",
            temperature
        );
        return RiskAssessment::no_risk(APPLE_SCAB_NAME);
    };

    let risk = (wetness_hours / required * 100.0).min(100.0);
    let value = round_half_up(risk);

    // Banded on the reported value so a 70 is never shown as Medium.
    let status = if value >= HIGH_RISK_CUTOFF {
        RiskStatus::High
    } else if value >= MEDIUM_RISK_CUTOFF {
        RiskStatus::Medium
    } else {
        RiskStatus::Low
    };

    RiskAssessment::new(APPLE_SCAB_NAME, value, status)
}

pub fn alternaria_blotch(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    ALTERNARIA_BLOTCH.evaluate(temperature, wetness_hours)
}

pub fn marssonina_blotch(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    MARSSONINA_BLOTCH.evaluate(temperature, wetness_hours)
}

pub fn powdery_mildew(temperature: f64, humidity: f64) -> RiskAssessment {
    POWDERY_MILDEW.evaluate(temperature, humidity)
}

pub fn cedar_apple_rust(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    CEDAR_APPLE_RUST.evaluate(temperature, wetness_hours)
}

pub fn black_rot(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    BLACK_ROT.evaluate(temperature, wetness_hours)
}

pub fn bitter_rot(temperature: f64, wetness_hours: f64) -> RiskAssessment {
    BITTER_ROT.evaluate(temperature, wetness_hours)
}

fn round_half_up(x: f64) -> i32 {
    (x + 0.5).floor() as i32
}
