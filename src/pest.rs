//! Pest risk bands.
//!
//! Codling moth, apple maggot and San Jose scale follow accumulated
//! degree-days; aphids and spider mites follow the latest reading.

use crate::degree_days::DegreeDayThreshold;
use crate::fungal::{Bound, Conditions, TempRange};
use crate::models::{RiskAssessment, RiskStatus};

pub const CODLING_MOTH_NAME: &str = "Codling Moth";
pub const APPLE_MAGGOT_NAME: &str = "Apple Maggot";
pub const SAN_JOSE_SCALE_NAME: &str = "San Jose Scale";
pub const APHIDS_NAME: &str = "Aphids";
pub const SPIDER_MITES_NAME: &str = "Spider Mites";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PestBand {
    pub value: i32,
    pub description: &'static str,
}

impl PestBand {
    fn assess(&self, name: &str, status: RiskStatus) -> RiskAssessment {
        RiskAssessment::new(name, self.value, status).with_description(self.description)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DegreeDayPestModel {
    pub threshold: DegreeDayThreshold,
    /// Medium once accumulation is strictly above this
    pub medium_above: f64,
    /// High once accumulation is strictly above this
    pub high_above: f64,
    pub low: PestBand,
    pub medium: PestBand,
    pub high: PestBand,
}

impl DegreeDayPestModel {
    pub fn name(&self) -> &'static str {
        self.threshold.species
    }

    pub fn evaluate(&self, degree_days: f64) -> RiskAssessment {
        if degree_days > self.high_above {
            self.high.assess(self.name(), RiskStatus::High)
        } else if degree_days > self.medium_above {
            self.medium.assess(self.name(), RiskStatus::Medium)
        } else {
            self.low.assess(self.name(), RiskStatus::Low)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadingPestModel {
    pub name: &'static str,
    pub high_when: Conditions,
    pub medium_when: Conditions,
    pub low: PestBand,
    pub medium: PestBand,
    pub high: PestBand,
}

impl ReadingPestModel {
    pub fn evaluate(&self, temperature: f64, humidity: f64) -> RiskAssessment {
        if self.high_when.matches(temperature, humidity) {
            self.high.assess(self.name, RiskStatus::High)
        } else if self.medium_when.matches(temperature, humidity) {
            self.medium.assess(self.name, RiskStatus::Medium)
        } else {
            self.low.assess(self.name, RiskStatus::Low)
        }
    }
}

pub const CODLING_MOTH: DegreeDayPestModel = DegreeDayPestModel {
    threshold: DegreeDayThreshold { species: CODLING_MOTH_NAME, lower: 10.0, upper: 31.1 },
    medium_above: 50.0,
    high_above: 250.0,
    low: PestBand {
        value: 0,
        description: "Adult flight not started. Keep pheromone traps in place.",
    },
    medium: PestBand {
        value: 40,
        description: "Moth flight and egg laying under way. Set biofix from trap catches.",
    },
    high: PestBand {
        value: 85,
        description: "Egg hatch period. Larvae entering fruit; time cover sprays now.",
    },
};

pub const APPLE_MAGGOT: DegreeDayPestModel = DegreeDayPestModel {
    threshold: DegreeDayThreshold { species: APPLE_MAGGOT_NAME, lower: 10.0, upper: 31.1 },
    medium_above: 400.0,
    high_above: 550.0,
    low: PestBand {
        value: 0,
        description: "Flies still pupating in soil. No action needed.",
    },
    medium: PestBand {
        value: 45,
        description: "First flies emerging. Hang red sphere traps on orchard edges.",
    },
    high: PestBand {
        value: 80,
        description: "Peak fly activity and egg laying. Protect fruit when traps catch flies.",
    },
};

pub const SAN_JOSE_SCALE: DegreeDayPestModel = DegreeDayPestModel {
    threshold: DegreeDayThreshold { species: SAN_JOSE_SCALE_NAME, lower: 10.0, upper: 32.2 },
    medium_above: 150.0,
    high_above: 300.0,
    low: PestBand {
        value: 0,
        description: "Overwintering scales dormant. Dormant oil is the main control.",
    },
    medium: PestBand {
        value: 45,
        description: "Males flying. Check tape traps on infested limbs for crawlers.",
    },
    high: PestBand {
        value: 80,
        description: "Crawlers active. Treat within the crawler window.",
    },
};

pub const APHIDS: ReadingPestModel = ReadingPestModel {
    name: APHIDS_NAME,
    high_when: Conditions { temperature: TempRange::new(20.0, 28.0), signal: Bound::AtLeast(60.0) },
    medium_when: Conditions { temperature: TempRange::new(15.0, 30.0), signal: Bound::AtLeast(40.0) },
    low: PestBand {
        value: 0,
        description: "Conditions unfavourable for colony growth.",
    },
    medium: PestBand {
        value: 50,
        description: "Colonies can build. Inspect shoot tips twice a week.",
    },
    high: PestBand {
        value: 80,
        description: "Rapid colony growth likely. Check for curled leaves and honeydew.",
    },
};

/// Mites favour hot, dry weather, so humidity is an upper limit here.
pub const SPIDER_MITES: ReadingPestModel = ReadingPestModel {
    name: SPIDER_MITES_NAME,
    high_when: Conditions { temperature: TempRange::new(27.0, 38.0), signal: Bound::AtMost(50.0) },
    medium_when: Conditions { temperature: TempRange::new(21.0, 40.0), signal: Bound::AtMost(60.0) },
    low: PestBand {
        value: 0,
        description: "Cool or humid conditions slow mite development.",
    },
    medium: PestBand {
        value: 50,
        description: "Mite populations can increase. Sample leaves for motile stages.",
    },
    high: PestBand {
        value: 85,
        description: "Hot and dry: mite outbreaks likely. Check leaf undersides for bronzing.",
    },
};

pub fn codling_moth(degree_days: f64) -> RiskAssessment {
    CODLING_MOTH.evaluate(degree_days)
}

pub fn apple_maggot(degree_days: f64) -> RiskAssessment {
    APPLE_MAGGOT.evaluate(degree_days)
}

pub fn san_jose_scale(degree_days: f64) -> RiskAssessment {
    SAN_JOSE_SCALE.evaluate(degree_days)
}

pub fn aphids(temperature: f64, humidity: f64) -> RiskAssessment {
    APHIDS.evaluate(temperature, humidity)
}

pub fn spider_mites(temperature: f64, humidity: f64) -> RiskAssessment {
    SPIDER_MITES.evaluate(temperature, humidity)
}
