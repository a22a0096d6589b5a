//! Broadcast notifications as delivered by the platform.
//!
//! An [`Intent`] is an action name plus a bag of typed extras. The vendor scan
//! service fills the extras listed in [`infrascan_core::constants`]; any other
//! sender may put arbitrary values under the same keys, so accessors report
//! type mismatches instead of guessing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One typed extra value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Extra {
    Bytes(Bytes),
    Int(i32),
    Text(String),
    Bool(bool),
}

impl Extra {
    /// Name of the carried type, used in fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
        }
    }
}

/// Extra present under the expected key but with another type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("extra `{key}` has type {found}, expected {expected}")]
pub struct ExtraTypeError {
    pub key: String,
    pub expected: &'static str,
    pub found: &'static str,
}

/// A broadcast notification.
///
/// # Examples
///
/// ```
/// use infrascan_bridge::intent::Intent;
///
/// let intent = Intent::new("scan.rcv.message")
///     .with_bytes("barocode", b"ABC".to_vec())
///     .with_int("length", 3)
///     .with_text("barcodeType", "CODE128");
///
/// assert_eq!(intent.int_extra("length").unwrap(), Some(3));
/// assert_eq!(intent.text_extra("aimid").unwrap(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    /// Action name the notification was sent under.
    pub action: String,

    /// Typed extras keyed by name.
    #[serde(default)]
    pub extras: HashMap<String, Extra>,
}

impl Intent {
    /// Create an intent with no extras.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            extras: HashMap::new(),
        }
    }

    /// Attach a raw byte extra.
    pub fn with_bytes(mut self, key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        self.extras.insert(key.into(), Extra::Bytes(value.into()));
        self
    }

    /// Attach an integer extra.
    pub fn with_int(mut self, key: impl Into<String>, value: i32) -> Self {
        self.extras.insert(key.into(), Extra::Int(value));
        self
    }

    /// Attach a text extra.
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), Extra::Text(value.into()));
        self
    }

    /// Attach a boolean extra.
    pub fn with_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.extras.insert(key.into(), Extra::Bool(value));
        self
    }

    /// Byte extra under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the extra exists with another type.
    pub fn bytes_extra(&self, key: &str) -> Result<Option<&Bytes>, ExtraTypeError> {
        match self.extras.get(key) {
            None => Ok(None),
            Some(Extra::Bytes(value)) => Ok(Some(value)),
            Some(other) => Err(Self::mismatch(key, "bytes", other)),
        }
    }

    /// Integer extra under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the extra exists with another type.
    pub fn int_extra(&self, key: &str) -> Result<Option<i32>, ExtraTypeError> {
        match self.extras.get(key) {
            None => Ok(None),
            Some(Extra::Int(value)) => Ok(Some(*value)),
            Some(other) => Err(Self::mismatch(key, "int", other)),
        }
    }

    /// Text extra under `key`, `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the extra exists with another type.
    pub fn text_extra(&self, key: &str) -> Result<Option<&str>, ExtraTypeError> {
        match self.extras.get(key) {
            None => Ok(None),
            Some(Extra::Text(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(Self::mismatch(key, "text", other)),
        }
    }

    fn mismatch(key: &str, expected: &'static str, found: &Extra) -> ExtraTypeError {
        ExtraTypeError {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }
}

/// Set of actions a receiver is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentFilter {
    actions: Vec<String>,
}

impl IntentFilter {
    /// Filter matching a single action.
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            actions: vec![action.into()],
        }
    }

    /// Also match `action`.
    pub fn add_action(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    /// Actions matched by this filter.
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Whether `intent` is addressed to one of the filter's actions.
    pub fn matches(&self, intent: &Intent) -> bool {
        self.actions.iter().any(|action| *action == intent.action)
    }
}
