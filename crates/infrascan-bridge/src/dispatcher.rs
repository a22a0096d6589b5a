//! Control-channel request routing.
//!
//! A [`MethodCall`] names one vendor operation and carries its arguments as a
//! JSON object. [`dispatch`] maps it onto the current [`DeviceHandle`] and
//! always produces a [`MethodResult`]; hardware faults never escape.
//!
//! Checks run in a fixed order:
//!
//! 1. unknown method name → [`MethodResult::NotImplemented`]
//! 2. no device handle → `NO_SDK`
//! 3. malformed arguments → `INVALID_ARGUMENT`

use infrascan_core::{Error, OutputMode, Result};
use infrascan_hardware::DeviceHandle;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use tracing::debug;

/// Method names understood by [`dispatch`].
pub const METHODS: [&str; 9] = [
    "isScanOpened",
    "openScan",
    "closeScan",
    "startScan",
    "stopScan",
    "resetScan",
    "setContinuous",
    "setOutScanMode",
    "getOutScanMode",
];

/// A request on the control channel.
///
/// # Examples
///
/// ```
/// use infrascan_bridge::dispatcher::MethodCall;
/// use serde_json::json;
///
/// let call: MethodCall =
///     serde_json::from_value(json!({ "method": "setOutScanMode", "arguments": { "mode": 0 } }))
///         .unwrap();
/// assert_eq!(call.method, "setOutScanMode");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,

    /// JSON object of named arguments, or `null`.
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    /// Call without arguments.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Value::Null,
        }
    }

    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = arguments;
        self
    }

    fn argument(&self, name: &str) -> Result<Option<&Value>> {
        match &self.arguments {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(map.get(name).filter(|value| !value.is_null())),
            other => Err(Error::invalid_argument(
                "arguments",
                format!("expected an object, got {other}"),
            )),
        }
    }

    fn bool_argument(&self, name: &str) -> Result<Option<bool>> {
        match self.argument(name)? {
            None => Ok(None),
            Some(Value::Bool(value)) => Ok(Some(*value)),
            Some(other) => Err(Error::invalid_argument(
                name,
                format!("expected a boolean, got {other}"),
            )),
        }
    }

    fn int_argument(&self, name: &str) -> Result<Option<i32>> {
        let Some(value) = self.argument(name)? else {
            return Ok(None);
        };
        value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                Error::invalid_argument(name, format!("expected an integer, got {value}"))
            })
    }
}

/// Outcome of a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "result", rename_all = "snake_case")]
pub enum MethodResult {
    /// The operation ran; `null` for operations without a result.
    Success(Value),

    /// The operation could not run.
    Error { code: String, message: String },

    /// No such method.
    NotImplemented,
}

impl MethodResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error code, if this is an error.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Error { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<Error> for MethodResult {
    fn from(error: Error) -> Self {
        Self::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// A parsed control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    IsScanOpened,
    OpenScan,
    CloseScan,
    StartScan,
    StopScan,
    ResetScan,
    SetContinuous { on: bool },
    SetOutScanMode { mode: OutputMode },
    GetOutScanMode,
}

impl Command {
    /// Parse a call into a command.
    ///
    /// Missing `on` means `false` and missing `mode` means broadcast.
    ///
    /// # Errors
    ///
    /// [`Error::NotImplemented`] for unknown names, [`Error::InvalidArgument`]
    /// for arguments of the wrong type or out of range.
    pub fn parse(call: &MethodCall) -> Result<Self> {
        let command = match call.method.as_str() {
            "isScanOpened" => Self::IsScanOpened,
            "openScan" => Self::OpenScan,
            "closeScan" => Self::CloseScan,
            "startScan" => Self::StartScan,
            "stopScan" => Self::StopScan,
            "resetScan" => Self::ResetScan,
            "setContinuous" => Self::SetContinuous {
                on: call.bool_argument("on")?.unwrap_or(false),
            },
            "setOutScanMode" => Self::SetOutScanMode {
                mode: match call.int_argument("mode")? {
                    Some(code) => OutputMode::try_from(code)?,
                    None => OutputMode::default(),
                },
            },
            "getOutScanMode" => Self::GetOutScanMode,
            other => return Err(Error::NotImplemented(other.to_string())),
        };
        Ok(command)
    }

    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsScanOpened => "isScanOpened",
            Self::OpenScan => "openScan",
            Self::CloseScan => "closeScan",
            Self::StartScan => "startScan",
            Self::StopScan => "stopScan",
            Self::ResetScan => "resetScan",
            Self::SetContinuous { .. } => "setContinuous",
            Self::SetOutScanMode { .. } => "setOutScanMode",
            Self::GetOutScanMode => "getOutScanMode",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Route `call` to the device.
pub async fn dispatch(handle: Option<&mut DeviceHandle>, call: &MethodCall) -> MethodResult {
    if !METHODS.contains(&call.method.as_str()) {
        debug!(method = %call.method, "Method not implemented");
        return MethodResult::NotImplemented;
    }

    let Some(handle) = handle else {
        debug!(method = %call.method, "No scan device");
        return Error::no_device_handle().into();
    };

    match Command::parse(call) {
        Ok(command) => execute(handle, command).await,
        Err(error) => {
            debug!(method = %call.method, %error, "Rejected arguments");
            error.into()
        }
    }
}

/// Run a parsed command against the device.
pub async fn execute(handle: &mut DeviceHandle, command: Command) -> MethodResult {
    debug!(%command, "Executing");
    let value = match command {
        Command::IsScanOpened => json!(handle.is_open().await.into_value()),
        Command::OpenScan => json!(handle.open().await.into_value()),
        Command::CloseScan => json!(handle.close().await.into_value()),
        Command::StartScan => json!(handle.start().await.into_value()),
        Command::StopScan => json!(handle.stop().await.into_value()),
        Command::ResetScan => json!(handle.reset().await.into_value()),
        Command::SetContinuous { on } => {
            handle.set_continuous(on).await;
            Value::Null
        }
        Command::SetOutScanMode { mode } => json!(handle.set_output_mode(mode).await.into_value()),
        Command::GetOutScanMode => json!(handle.output_mode().await.into_value().as_i32()),
    };
    MethodResult::Success(value)
}
