pub mod models;

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use thiserror::Error;
use tracing::debug;

use self::models::SensorFields;

/// Why a single fetch from the device produced no reading.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("device request timed out")]
    Timeout(#[source] reqwest::Error),
    #[error("device request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("device returned error status {0}")]
    Status(reqwest::StatusCode),
    #[error("device returned malformed body: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if let Some(status) = e.status() {
            Self::Status(status)
        } else {
            Self::Transport(e)
        }
    }
}

/// HTTP client for the sensor device's fixed endpoint.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    url: String,
}

impl DeviceClient {
    /// Every request made by this client is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Transport)?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                url: url.into(),
            }),
        })
    }

    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Fetch the current sensor fields from the device.
    pub async fn fetch(&self) -> Result<SensorFields, FetchError> {
        debug!(url = %self.inner.url, "Fetching sensor fields from device");

        let bytes = self
            .inner
            .http
            .get(&self.inner.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        Ok(serde_json::from_slice::<SensorFields>(&bytes)?)
    }
}
