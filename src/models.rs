use chrono::{DateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A field value as delivered by a data provider, before coercion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Unsupported(IgnoredAny),
}

/// One reading in whatever shape the provider sends it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default, alias = "time", alias = "created_at", alias = "recorded_at")]
    pub timestamp: Option<RawValue>,
    #[serde(default, alias = "temperature")]
    pub temp: Option<RawValue>,
    #[serde(default)]
    pub humidity: Option<RawValue>,
    #[serde(default, alias = "wetness", alias = "leaf_wetness")]
    pub rainfall: Option<RawValue>,
}

/// A normalized reading. Temperature in °C, humidity in percent, wetness is
/// the rainfall or leaf-wetness factor reported by the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRecord {
    pub timestamp: Option<DateTime<Utc>>,
    pub temperature: f64,
    pub humidity: f64,
    pub wetness: f64,
}

impl SensorRecord {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, humidity: f64, wetness: f64) -> Self {
        Self {
            timestamp: Some(timestamp),
            temperature,
            humidity,
            wetness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Device {
    #[serde(alias = "d_id", deserialize_with = "deserialize_device_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Device ids arrive as numbers from some backends and strings from others.
pub(crate) fn deserialize_device_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Number(i64),
        String(String),
    }

    match IdValue::deserialize(deserializer)? {
        IdValue::Number(n) => Ok(n.to_string()),
        IdValue::String(s) if !s.trim().is_empty() => Ok(s),
        IdValue::String(_) => Err(serde::de::Error::custom("Device id cannot be empty")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    #[serde(rename = "No Risk")]
    NoRisk,
    Low,
    Medium,
    High,
}

impl RiskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskStatus::NoRisk => "No Risk",
            RiskStatus::Low => "Low",
            RiskStatus::Medium => "Medium",
            RiskStatus::High => "High",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one model for one evaluation window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub name: String,
    pub value: i32,
    pub status: RiskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RiskAssessment {
    pub fn new(name: &str, value: i32, status: RiskStatus) -> Self {
        Self {
            name: name.to_string(),
            value,
            status,
            description: None,
        }
    }

    pub fn no_risk(name: &str) -> Self {
        Self::new(name, 0, RiskStatus::NoRisk)
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_record_accepts_mixed_field_types() {
        let json = r#"{"created_at": "2024-06-01T10:00:00Z", "temp": "21.5", "humidity": 80, "rainfall": null}"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();

        assert_eq!(
            raw.timestamp,
            Some(RawValue::Text("2024-06-01T10:00:00Z".to_string()))
        );
        assert_eq!(raw.temp, Some(RawValue::Text("21.5".to_string())));
        assert_eq!(raw.humidity, Some(RawValue::Number(80.0)));
        assert_eq!(raw.rainfall, None);
    }

    #[test]
    fn test_raw_record_tolerates_nested_values() {
        let json = r#"{"timestamp": 1717236000, "temperature": {"value": 3}, "wetness": true}"#;
        let raw: RawRecord = serde_json::from_str(json).unwrap();

        assert_eq!(raw.timestamp, Some(RawValue::Number(1717236000.0)));
        assert!(matches!(raw.temp, Some(RawValue::Unsupported(_))));
        assert_eq!(raw.rainfall, Some(RawValue::Flag(true)));
        assert_eq!(raw.humidity, None);
    }

    #[test]
    fn test_device_id_from_number_or_string() {
        let device: Device = serde_json::from_str(r#"{"d_id": 42, "name": "North Block"}"#).unwrap();
        assert_eq!(device.id, "42");
        assert_eq!(device.name, "North Block");

        let device: Device = serde_json::from_str(r#"{"id": "orchard-7"}"#).unwrap();
        assert_eq!(device.id, "orchard-7");
        assert_eq!(device.name, "");
    }

    #[test]
    fn test_device_id_rejects_blank() {
        let result: std::result::Result<Device, _> = serde_json::from_str(r#"{"d_id": "  "}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_assessment_serialization_skips_missing_description() {
        let scab = RiskAssessment::new("Apple Scab", 100, RiskStatus::High);
        let json = serde_json::to_string(&scab).unwrap();
        assert_eq!(json, r#"{"name":"Apple Scab","value":100,"status":"High"}"#);

        let moth = RiskAssessment::no_risk("Codling Moth").with_description("Scout weekly");
        let json = serde_json::to_string(&moth).unwrap();
        assert_eq!(
            json,
            r#"{"name":"Codling Moth","value":0,"status":"No Risk","description":"Scout weekly"}"#
        );
    }
}
