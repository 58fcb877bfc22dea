use std::{path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Device endpoint polled on every tick, e.g. `http://192.168.4.1/get`.
    pub device_url: String,
    /// Sensor polling interval in seconds.
    pub poll_interval_secs: u64,
    /// Per-request timeout for the device fetch, in milliseconds.
    /// Must be strictly shorter than the poll interval.
    pub fetch_timeout_ms: u64,
    /// JSON file holding the last successfully captured reading.
    pub mirror_path: PathBuf,
}

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: &str = "6969";
const DEFAULT_DEVICE_URL: &str = "http://192.168.4.1/get";
const DEFAULT_POLL_INTERVAL_SECS: &str = "10";
const DEFAULT_FETCH_TIMEOUT_MS: &str = "5000";
const DEFAULT_MIRROR_PATH: &str = "./sensor_data.json";

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from `lookup`, falling back to the defaults above for
    /// any key it does not know.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let optional = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());

        let config = Self {
            server_host: optional("SERVER_HOST", DEFAULT_SERVER_HOST),
            server_port: optional("SERVER_PORT", DEFAULT_SERVER_PORT)
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            device_url: optional("DEVICE_URL", DEFAULT_DEVICE_URL),
            poll_interval_secs: optional("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL_SECS)
                .parse()
                .context("POLL_INTERVAL_SECS must be a positive integer")?,
            fetch_timeout_ms: optional("FETCH_TIMEOUT_MS", DEFAULT_FETCH_TIMEOUT_MS)
                .parse()
                .context("FETCH_TIMEOUT_MS must be a positive integer")?,
            mirror_path: PathBuf::from(optional("MIRROR_PATH", DEFAULT_MIRROR_PATH)),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// A hung device must never pile up outstanding fetches, so every fetch
    /// has to finish (or time out) before the next tick is due.
    fn validate(&self) -> Result<()> {
        if self.poll_interval_secs == 0 {
            bail!("POLL_INTERVAL_SECS must be greater than zero");
        }
        if self.fetch_timeout_ms == 0 {
            bail!("FETCH_TIMEOUT_MS must be greater than zero");
        }
        if self.fetch_timeout() >= self.poll_interval() {
            bail!(
                "FETCH_TIMEOUT_MS ({}) must be shorter than POLL_INTERVAL_SECS ({}s)",
                self.fetch_timeout_ms,
                self.poll_interval_secs
            );
        }
        Ok(())
    }
}
