//! Terminal configuration loaded from TOML.
//!
//! The file has three sections. Only `[device]` identity fields and the
//! authority URL are mandatory; every timing value falls back to the defaults
//! in [`constants`](crate::constants).
//!
//! ```toml
//! [device]
//! resource_id = "ERNPTY"
//! api_key = "5618e7db..."
//! device_type = "machine"
//! master_key = "01234567"
//!
//! [authority]
//! url = "wss://makerpass.example.com/ws"
//!
//! [timing]
//! card_present_timeout_ms = 2000
//! ```

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CARD_PRESENT_TIMEOUT_MS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_DOOR_PULSE_MS,
    DEFAULT_KEEPALIVE_TIMEOUT_MS, DEFAULT_RECONNECT_INTERVAL_MS, DEFAULT_TICK_INTERVAL_MS,
};
use crate::{CardCode, DeviceType, Error, Result};

/// Complete terminal configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub device: DeviceConfig,
    pub authority: AuthorityConfig,
    #[serde(default)]
    pub timing: TimingConfig,
}

/// Immutable device identity.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Resource identifier registered with the authority.
    pub resource_id: String,

    /// API key presented in `device_auth`. Never logged.
    pub api_key: String,

    pub device_type: DeviceType,

    /// Card code granting local, offline-capable override access.
    pub master_key: CardCode,

    /// Relay pulse length for door devices.
    #[serde(default = "default_door_pulse_ms")]
    pub door_pulse_ms: u64,
}

impl DeviceConfig {
    /// Door relay pulse as a [`Duration`].
    #[must_use]
    pub fn door_pulse(&self) -> Duration {
        Duration::from_millis(self.door_pulse_ms)
    }
}

// Manual impl keeps the API key out of logs.
impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("resource_id", &self.resource_id)
            .field("api_key", &"<redacted>")
            .field("device_type", &self.device_type)
            .field("master_key", &"<redacted>")
            .field("door_pulse_ms", &self.door_pulse_ms)
            .finish()
    }
}

/// Where and how to reach the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityConfig {
    /// WebSocket endpoint, e.g. `wss://host/ws`.
    pub url: String,

    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl AuthorityConfig {
    #[must_use]
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Timeout domains of the control loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    #[serde(default = "default_keepalive_timeout_ms")]
    pub keepalive_timeout_ms: u64,

    #[serde(default = "default_card_present_timeout_ms")]
    pub card_present_timeout_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl TimingConfig {
    #[must_use]
    pub fn keepalive_timeout(&self) -> Duration {
        Duration::from_millis(self.keepalive_timeout_ms)
    }

    #[must_use]
    pub fn card_present_timeout(&self) -> Duration {
        Duration::from_millis(self.card_present_timeout_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keepalive_timeout_ms: default_keepalive_timeout_ms(),
            card_present_timeout_ms: default_card_present_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

fn default_door_pulse_ms() -> u64 {
    DEFAULT_DOOR_PULSE_MS
}

fn default_reconnect_interval_ms() -> u64 {
    DEFAULT_RECONNECT_INTERVAL_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_keepalive_timeout_ms() -> u64 {
    DEFAULT_KEEPALIVE_TIMEOUT_MS
}

fn default_card_present_timeout_ms() -> u64 {
    DEFAULT_CARD_PRESENT_TIMEOUT_MS
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read, `Error::ConfigParse` if
    /// the TOML is malformed, and `Error::Config` if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    ///
    /// # Errors
    /// Returns `Error::ConfigParse` on malformed TOML or `Error::Config` on
    /// invalid values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    /// Returns `Error::Config` describing the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        if self.device.resource_id.trim().is_empty() {
            return Err(Error::Config("device.resource_id must not be empty".into()));
        }
        if self.device.api_key.trim().is_empty() {
            return Err(Error::Config("device.api_key must not be empty".into()));
        }
        if self.authority.url.trim().is_empty() {
            return Err(Error::Config("authority.url must not be empty".into()));
        }

        let durations = [
            ("device.door_pulse_ms", self.device.door_pulse_ms),
            (
                "authority.reconnect_interval_ms",
                self.authority.reconnect_interval_ms,
            ),
            ("authority.connect_timeout_ms", self.authority.connect_timeout_ms),
            ("timing.keepalive_timeout_ms", self.timing.keepalive_timeout_ms),
            (
                "timing.card_present_timeout_ms",
                self.timing.card_present_timeout_ms,
            ),
            ("timing.tick_interval_ms", self.timing.tick_interval_ms),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, value)| *value == 0) {
            return Err(Error::Config(format!("{name} must be greater than zero")));
        }

        if self.timing.tick_interval_ms >= self.timing.card_present_timeout_ms {
            return Err(Error::Config(format!(
                "timing.tick_interval_ms ({}) must be below timing.card_present_timeout_ms ({})",
                self.timing.tick_interval_ms, self.timing.card_present_timeout_ms
            )));
        }

        Ok(())
    }
}
