use crate::error::{AppError, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Largest UTC offset in use anywhere (UTC+14)
const MAX_OFFSET_MINUTES: u32 = 14 * 60;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    #[serde(default)]
    pub evaluation: EvaluationConfig,
    #[serde(default)]
    pub devices: DeviceFilter,
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Http,
    Fixture,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_range")]
    pub range: String,
    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub auth_token: Option<String>,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
}

fn default_range() -> String {
    "weekly".to_string()
}

fn default_request_delay_ms() -> u64 {
    500 // 500ms delay between device requests
}

/// Treat an empty string (an unset optional env var) as absent
fn deserialize_optional_secret<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EvaluationConfig {
    /// Fixed offset used to decide which calendar day a reading belongs to
    #[serde(default, deserialize_with = "deserialize_minutes")]
    pub utc_offset_minutes: i32,
    #[serde(default = "default_wetness_window_days")]
    pub wetness_window_days: Option<u32>,
    #[serde(default)]
    pub degree_day_window_days: Option<u32>,
}

fn default_wetness_window_days() -> Option<u32> {
    Some(7)
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: 0,
            wetness_window_days: default_wetness_window_days(),
            degree_day_window_days: None,
        }
    }
}

impl EvaluationConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "utc_offset_minutes {} is not a valid offset",
                    self.utc_offset_minutes
                ))
            })
    }
}

/// Custom deserializer that handles offsets as both number and string
///
/// Accepts:
/// - `utc_offset_minutes: 120` (number)
/// - `utc_offset_minutes: "-300"` (string that parses to number)
/// - `utc_offset_minutes: ${UTC_OFFSET}` (env var substituted to either)
fn deserialize_minutes<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MinutesValue {
        Number(i32),
        String(String),
    }

    match MinutesValue::deserialize(deserializer)? {
        MinutesValue::Number(n) => Ok(n),
        MinutesValue::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid offset minutes: '{}'", s))),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub interval_minutes: u64,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: u64,
    #[serde(default)]
    pub run_once: bool,
}

fn default_initial_delay() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DeviceFilter {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl DeviceFilter {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.patterns.is_empty()
    }

    /// A device passes if its id is listed or its name matches a pattern.
    pub fn matches(&self, id: &str, name: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        if self.ids.iter().any(|wanted| wanted == id) {
            return true;
        }

        self.patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(name))
                .unwrap_or(false)
        })
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - A usable source for the selected kind
    /// - HTTPS base URLs
    /// - Offsets and windows in range
    /// - Positive scheduler interval
    /// - Valid device patterns
    fn validate(&self) -> Result<()> {
        match self.source.kind {
            SourceKind::Http => {
                let base_url = self.source.base_url.as_deref().ok_or_else(|| {
                    AppError::Config("source.base_url is required for http sources".to_string())
                })?;

                let parsed = url::Url::parse(base_url).map_err(|e| {
                    AppError::Config(format!("Invalid source base_url '{}': {}", base_url, e))
                })?;

                if parsed.scheme() != "https" {
                    return Err(AppError::Config(format!(
                        "Source base_url must use HTTPS, got: {}",
                        parsed.scheme()
                    )));
                }

                if self.source.range.trim().is_empty() {
                    return Err(AppError::Config("source.range cannot be empty".to_string()));
                }
            }
            SourceKind::Fixture => {
                if self.source.fixture_path.is_none() {
                    return Err(AppError::Config(
                        "source.fixture_path is required for fixture sources".to_string(),
                    ));
                }
            }
        }

        if self.evaluation.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(AppError::Config(format!(
                "evaluation.utc_offset_minutes {} is outside ±{}",
                self.evaluation.utc_offset_minutes, MAX_OFFSET_MINUTES
            )));
        }

        for (name, window) in [
            ("wetness_window_days", self.evaluation.wetness_window_days),
            ("degree_day_window_days", self.evaluation.degree_day_window_days),
        ] {
            if window == Some(0) {
                return Err(AppError::Config(format!(
                    "evaluation.{} must be at least 1 when set",
                    name
                )));
            }
        }

        if self.scheduler.interval_minutes == 0 {
            return Err(AppError::Config(
                "Scheduler interval_minutes must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.interval_minutes < 5 && !self.scheduler.run_once {
            tracing::warn!(
                "Scheduler interval of {} minutes is very short, consider using at least 5 minutes",
                self.scheduler.interval_minutes
            );
        }

        for pattern in &self.devices.patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(AppError::Config(format!(
                    "Invalid device pattern '{}': {}",
                    pattern, e
                )));
            }
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid substitution pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root (copy .env.example)\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or set {} in your environment before running",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTTP_CONFIG: &str = r#"
source:
  kind: http
  base_url: https://api.example.com
scheduler:
  interval_minutes: 60
"#;

    #[test]
    fn test_minimal_http_config_defaults() {
        let config = Config::from_yaml(HTTP_CONFIG).unwrap();

        assert_eq!(config.source.kind, SourceKind::Http);
        assert_eq!(config.source.range, "weekly");
        assert_eq!(config.source.request_delay_ms, 500);
        assert_eq!(config.source.auth_token, None);
        assert_eq!(config.evaluation, EvaluationConfig::default());
        assert_eq!(config.evaluation.wetness_window_days, Some(7));
        assert_eq!(config.scheduler.initial_delay_seconds, 10);
        assert!(!config.scheduler.run_once);
        assert_eq!(config.output.directory, PathBuf::from("reports"));
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_http_requires_https() {
        let yaml = HTTP_CONFIG.replace("https://", "http://");
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("must use HTTPS"));
    }

    #[test]
    fn test_fixture_requires_path() {
        let yaml = r#"
source:
  kind: fixture
scheduler:
  interval_minutes: 60
"#;
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("fixture_path"));
    }

    #[test]
    fn test_offset_and_window_validation() {
        let yaml = format!("{}evaluation:\n  utc_offset_minutes: 900\n", HTTP_CONFIG);
        assert!(Config::from_yaml(&yaml).is_err());

        let yaml = format!("{}evaluation:\n  wetness_window_days: 0\n", HTTP_CONFIG);
        assert!(Config::from_yaml(&yaml).is_err());

        let yaml = format!(
            "{}evaluation:\n  utc_offset_minutes: \"-300\"\n  wetness_window_days: ~\n",
            HTTP_CONFIG
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.evaluation.utc_offset_minutes, -300);
        assert_eq!(config.evaluation.wetness_window_days, None);
        assert_eq!(
            config.evaluation.offset().unwrap(),
            FixedOffset::west_opt(5 * 3600).unwrap()
        );
    }

    #[test]
    fn test_extreme_offsets_are_rejected_without_overflow() {
        let yaml = format!("{}evaluation:\n  utc_offset_minutes: {}\n", HTTP_CONFIG, i32::MIN);
        assert!(Config::from_yaml(&yaml).is_err());

        for minutes in [i32::MIN, i32::MAX, 35_791_395] {
            let evaluation = EvaluationConfig {
                utc_offset_minutes: minutes,
                ..EvaluationConfig::default()
            };
            assert!(evaluation.offset().is_err(), "offset {}", minutes);
        }
    }

    #[test]
    fn test_empty_auth_token_is_none() {
        let yaml = HTTP_CONFIG.replace(
            "base_url: https://api.example.com",
            "base_url: https://api.example.com\n  auth_token: \"\"",
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.source.auth_token, None);
    }

    #[test]
    fn test_missing_env_var_reported() {
        let yaml = HTTP_CONFIG.replace(
            "https://api.example.com",
            "${ORCHARD_RISK_TEST_UNSET_BASE_URL}",
        );
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("ORCHARD_RISK_TEST_UNSET_BASE_URL"));
    }

    #[test]
    fn test_device_filter_matches() {
        let filter = DeviceFilter {
            ids: vec!["12".to_string()],
            patterns: vec!["North*".to_string()],
        };

        assert!(filter.matches("12", "South Block"));
        assert!(filter.matches("99", "North Block"));
        assert!(!filter.matches("99", "South Block"));
    }

    #[test]
    fn test_empty_device_filter_matches_all() {
        let filter = DeviceFilter::default();
        assert!(filter.matches("1", "anything"));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_invalid_device_pattern_rejected() {
        let yaml = format!("{}devices:\n  patterns: [\"[\"]\n", HTTP_CONFIG);
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("Invalid device pattern"));
    }
}
