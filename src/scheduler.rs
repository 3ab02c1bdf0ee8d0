use crate::config::Config;
use crate::error::Result;
use crate::models::Device;
use crate::normalizer::Normalizer;
use crate::output::ReportWriter;
use crate::pipeline::Evaluator;
use crate::provider::SensorSource;
use crate::report::{zone_color, DeviceReport};
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::{interval, Duration};
use tracing::{error, info, warn};

/// Outcome of one pass over all selected devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub evaluated: usize,
    pub no_data: usize,
    pub failed: usize,
    pub filtered_out: usize,
}

pub struct Scheduler<S> {
    config: Config,
    source: S,
    evaluator: Evaluator,
    writer: ReportWriter,
    shutdown_rx: watch::Receiver<bool>,
}

impl<S: SensorSource> Scheduler<S> {
    pub fn new(config: Config, source: S, shutdown_rx: watch::Receiver<bool>) -> Result<Self> {
        let evaluator = Evaluator::new(&config.evaluation)?;
        let writer = ReportWriter::new(&config.output.directory)?;

        Ok(Self {
            config,
            source,
            evaluator,
            writer,
            shutdown_rx,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let initial_delay = Duration::from_secs(self.config.scheduler.initial_delay_seconds);
        let poll_interval = Duration::from_secs(self.config.scheduler.interval_minutes * 60);

        info!(
            "Scheduler starting with {}s initial delay, {}m interval",
            self.config.scheduler.initial_delay_seconds, self.config.scheduler.interval_minutes
        );

        // Initial delay
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {},
            _ = self.shutdown_rx.changed() => {
                info!("Shutdown received during initial delay");
                return Ok(());
            }
        }

        // Run immediately, then on interval
        if let Err(e) = self.run_pass(Utc::now()).await {
            error!("Evaluation pass error: {}", e);
        }

        if self.config.scheduler.run_once {
            info!("run_once set, stopping after first pass");
            return Ok(());
        }

        let mut ticker = interval(poll_interval);
        ticker.tick().await; // First tick is immediate, skip it

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.run_pass(Utc::now()).await {
                        error!("Evaluation pass error: {}", e);
                    }
                }
                _ = self.shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Evaluate every selected device as of `now`.
    ///
    /// A failing device is logged and counted; it does not stop the pass.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary> {
        info!("Starting evaluation pass");

        let devices = self.source.list_devices().await?;
        let mut summary = PassSummary::default();

        for device in devices {
            if !self.config.devices.matches(&device.id, &device.name) {
                summary.filtered_out += 1;
                continue;
            }

            match self.evaluate_device(&device, now).await {
                Ok(Some(report)) => {
                    summary.evaluated += 1;
                    if let Some(top) = report.highest() {
                        info!(
                            "Device {} ({}): {} assessments, highest {} at {} ({}, {:?} zone)",
                            device.id,
                            device.name,
                            report.assessments.len(),
                            top.name,
                            top.value,
                            top.status,
                            zone_color(top.value)
                        );
                    }
                }
                Ok(None) => {
                    summary.no_data += 1;
                    warn!("No data available for device {} ({})", device.id, device.name);
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Error evaluating device {}: {}", device.id, e);
                }
            }

            // Rate limiting: delay between device requests
            if self.config.source.request_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.source.request_delay_ms)).await;
            }
        }

        info!(
            "Evaluation pass complete: {} evaluated, {} without data, {} failed, {} filtered out",
            summary.evaluated, summary.no_data, summary.failed, summary.filtered_out
        );

        Ok(summary)
    }

    async fn evaluate_device(&self, device: &Device, now: DateTime<Utc>) -> Result<Option<DeviceReport>> {
        let raws = self.source.fetch_history(device).await?;
        let (records, stats) = Normalizer::normalize(&raws, self.evaluator.timestamp_policy())?;

        if !stats.is_clean() {
            warn!(
                "Device {}: {} fields coerced to 0, {} records without timestamp",
                device.id, stats.coerced_fields, stats.missing_timestamps
            );
        }

        let assessments = self.evaluator.evaluate(&records, now);
        if assessments.is_empty() {
            return Ok(None);
        }

        let report = DeviceReport::new(device, now, assessments);
        self.writer.write(&report)?;
        Ok(Some(report))
    }
}
