use crate::error::Result;
use crate::report::DeviceReport;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes one JSON document per device, replacing the previous one.
pub struct ReportWriter {
    directory: PathBuf,
}

impl ReportWriter {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        std::fs::create_dir_all(directory.as_ref())?;
        Ok(Self {
            directory: directory.as_ref().to_path_buf(),
        })
    }

    pub fn path_for(&self, device_id: &str) -> PathBuf {
        let file_name: String = device_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.directory.join(format!("{}.json", file_name))
    }

    pub fn write(&self, report: &DeviceReport) -> Result<PathBuf> {
        let path = self.path_for(&report.device_id);
        let json = serde_json::to_string_pretty(report)?;

        // write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;

        debug!("Wrote report for device {} to {}", report.device_id, path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Device, RiskAssessment, RiskStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_path_sanitizes_device_id() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        assert_eq!(writer.path_for("north-7"), dir.path().join("north-7.json"));
        assert_eq!(writer.path_for("../etc/x"), dir.path().join("___etc_x.json"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested")).unwrap();

        let device = Device {
            id: "12".to_string(),
            name: "Block C".to_string(),
        };
        let report = DeviceReport::new(
            &device,
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            vec![RiskAssessment::new("Apple Scab", 45, RiskStatus::Medium)],
        );

        let path = writer.write(&report).unwrap();
        let written: DeviceReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(written, report);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
