use crate::error::{AppError, Result};
use crate::models::{deserialize_device_id, Device, RawRecord};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where sensor history comes from.
#[allow(async_fn_in_trait)]
pub trait SensorSource {
    async fn list_devices(&self) -> Result<Vec<Device>>;

    async fn fetch_history(&self, device: &Device) -> Result<Vec<RawRecord>>;
}

/// Responses arrive either bare or wrapped as `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Option<Vec<T>> },
}

impl<T> Envelope<T> {
    fn into_items(self) -> Vec<T> {
        match self {
            Envelope::Bare(items) => items,
            Envelope::Wrapped { data } => data.unwrap_or_default(),
        }
    }
}

pub struct HttpSource {
    client: Client,
    base_url: Url,
    range: String,
    auth_token: Option<String>,
}

impl HttpSource {
    pub fn new(base_url: &str, range: &str, auth_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("orchard-risk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/')).map_err(|e| {
            AppError::InvalidData(format!("Invalid base URL '{}': {}", base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(AppError::InvalidData(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            range: range.to_string(),
            auth_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InvalidData(format!("Base URL '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_items<T: DeserializeOwned>(&self, url: &Url, query: &[(&str, &str)]) -> Result<Vec<T>> {
        retry_with_backoff(3, || async move {
            debug!("GET {}", url);

            let mut request = self.client.get(url.clone()).query(query);
            if let Some(token) = &self.auth_token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?.error_for_status()?;
            let body = response.text().await?;
            let envelope: Envelope<T> = serde_json::from_str(&body)?;
            Ok(envelope.into_items())
        })
        .await
    }
}

impl SensorSource for HttpSource {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        let url = self.endpoint(&["devices"])?;
        let devices: Vec<Device> = self.get_items(&url, &[]).await?;
        info!("Found {} devices", devices.len());
        Ok(devices)
    }

    async fn fetch_history(&self, device: &Device) -> Result<Vec<RawRecord>> {
        let url = self.endpoint(&["devices", &device.id, "history"])?;
        let records: Vec<RawRecord> = self
            .get_items(&url, &[("range", self.range.as_str())])
            .await?;
        debug!("Fetched {} records for device {}", records.len(), device.id);
        Ok(records)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureDevice {
    #[serde(alias = "d_id", deserialize_with = "deserialize_device_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    records: Vec<RawRecord>,
}

#[derive(Debug, Clone, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    devices: Vec<FixtureDevice>,
}

/// Serves device history from a YAML file instead of a live API.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    devices: Vec<FixtureDevice>,
}

impl FixtureSource {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: FixtureFile = serde_yaml::from_str(content)?;
        Ok(Self {
            devices: file.devices,
        })
    }
}

impl SensorSource for FixtureSource {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        Ok(self
            .devices
            .iter()
            .map(|d| Device {
                id: d.id.clone(),
                name: d.name.clone(),
            })
            .collect())
    }

    async fn fetch_history(&self, device: &Device) -> Result<Vec<RawRecord>> {
        self.devices
            .iter()
            .find(|d| d.id == device.id)
            .map(|d| d.records.clone())
            .ok_or_else(|| AppError::InvalidData(format!("Unknown fixture device '{}'", device.id)))
    }
}

/// Retry a future with exponential backoff
async fn retry_with_backoff<F, Fut, T>(max_retries: u32, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut retries = 0;
    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                retries += 1;

                if retries > max_retries || !is_transient(&e) {
                    return Err(e);
                }

                let delay = Duration::from_secs(2u64.pow(retries - 1));
                warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}...",
                    retries, max_retries, e, delay
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Connection errors, timeouts and 5xx responses are worth retrying
fn is_transient(e: &AppError) -> bool {
    match e {
        AppError::Http(err) => {
            err.is_timeout()
                || err.is_connect()
                || err.status().is_some_and(|s| s.is_server_error())
        }
        AppError::Io(_) => true,
        _ => false,
    }
}
