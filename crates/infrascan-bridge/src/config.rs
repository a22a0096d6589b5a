//! Runtime configuration of the bridge.

use infrascan_core::constants::{
    DEFAULT_DELIVERY_TIMEOUT_MS, DEFAULT_EVENT_BUFFER, DEFAULT_MAILBOX_CAPACITY, SCAN_ACTION,
};
use infrascan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bridge configuration.
///
/// Every field has a default, so a partial JSON document is accepted.
///
/// # Examples
///
/// ```
/// use infrascan_bridge::config::BridgeConfig;
///
/// let config = BridgeConfig::from_json_str(r#"{ "event_buffer": 8 }"#).unwrap();
/// assert_eq!(config.event_buffer, 8);
/// assert_eq!(config.scan_action, "scan.rcv.message");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Broadcast action carrying scan results.
    pub scan_action: String,

    /// Capacity of each subscriber's event channel.
    pub event_buffer: usize,

    /// Capacity of the plugin main-loop mailbox.
    pub mailbox_capacity: usize,

    /// How long a delivery may wait on a full event channel.
    pub delivery_timeout_ms: u64,

    /// Force broadcast output mode whenever the device is (re)acquired.
    pub force_broadcast_on_attach: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            scan_action: SCAN_ACTION.to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            delivery_timeout_ms: DEFAULT_DELIVERY_TIMEOUT_MS,
            force_broadcast_on_attach: true,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] for malformed documents and [`Error::Config`]
    /// for values [`validate`](Self::validate) rejects.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.scan_action.trim().is_empty() {
            return Err(Error::Config("scan_action must not be empty".to_string()));
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be at least 1".to_string()));
        }
        if self.mailbox_capacity == 0 {
            return Err(Error::Config(
                "mailbox_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}
