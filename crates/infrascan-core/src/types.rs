use crate::{
    Result,
    constants::{LASER_MODE_CONTINUOUS, LASER_MODE_SINGLE},
    error::Error,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How decoded scan results leave the vendor scan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Results are announced as broadcasts (the only mode the bridge can see).
    #[default]
    Broadcast,

    /// Results are injected into the focused edit box.
    EditBox,

    /// Results are typed through keyboard emulation.
    Keyboard,
}

impl OutputMode {
    /// Vendor numeric code for this mode.
    #[must_use]
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Broadcast => 0,
            Self::EditBox => 1,
            Self::Keyboard => 2,
        }
    }
}

impl TryFrom<i32> for OutputMode {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Broadcast),
            1 => Ok(Self::EditBox),
            2 => Ok(Self::Keyboard),
            other => Err(Error::invalid_argument(
                "mode",
                format!("expected 0, 1 or 2, got {other}"),
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Broadcast => "Broadcast",
            Self::EditBox => "EditBox",
            Self::Keyboard => "Keyboard",
        };
        write!(f, "{name}")
    }
}

/// Laser trigger behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaserMode {
    /// Laser keeps scanning until stopped.
    Continuous,

    /// One scan per trigger.
    Single,
}

impl LaserMode {
    /// Map the application-level continuous flag to a laser mode.
    #[must_use]
    pub fn from_continuous(on: bool) -> Self {
        if on { Self::Continuous } else { Self::Single }
    }

    /// Vendor numeric constant for this mode.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Continuous => LASER_MODE_CONTINUOUS,
            Self::Single => LASER_MODE_SINGLE,
        }
    }

    #[must_use]
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous)
    }
}

/// One decoded hardware scan.
///
/// Built once per received broadcast and handed to the subscriber; the bridge
/// keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Text decoded from the first `length` bytes of `raw`.
    pub code: String,

    /// Number of meaningful bytes, never larger than `raw.len()`.
    pub length: usize,

    /// Symbology name reported by the scan service.
    #[serde(rename = "barcodeType")]
    pub symbology: String,

    /// AIM identifier reported by the scan service.
    #[serde(rename = "aimId")]
    pub aim_id: String,

    /// Full raw payload as received.
    pub raw: Bytes,
}

impl ScanEvent {
    /// Meaningful prefix of the raw payload.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.raw[..self.length.min(self.raw.len())]
    }
}
