use thiserror::Error;

use crate::constants::{ERROR_CODE_INVALID_ARGUMENT, ERROR_CODE_NO_SDK, ERROR_CODE_RECEIVER};

#[derive(Error, Debug)]
pub enum Error {
    // Control surface errors
    #[error("Scan device unavailable: {0}")]
    NoDeviceHandle(String),

    #[error("Method not implemented: {0}")]
    NotImplemented(String),

    #[error("Invalid argument `{name}`: {message}")]
    InvalidArgument { name: String, message: String },

    // Event stream errors
    #[error("Receiver fault: {0}")]
    ReceiverFault(String),

    // Hardware errors
    #[error("Hardware call `{operation}` failed: {message}")]
    HardwareCallFailure { operation: String, message: String },

    // Runtime errors
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a no-device-handle error with the default message.
    pub fn no_device_handle() -> Self {
        Self::NoDeviceHandle("ScanDevice not found: vendor SDK or scan service missing".to_string())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a hardware call failure.
    pub fn hardware_call(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HardwareCallFailure {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Stable code reported to the application layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoDeviceHandle(_) => ERROR_CODE_NO_SDK,
            Self::NotImplemented(_) => "NOT_IMPLEMENTED",
            Self::InvalidArgument { .. } => ERROR_CODE_INVALID_ARGUMENT,
            Self::ReceiverFault(_) => ERROR_CODE_RECEIVER,
            Self::HardwareCallFailure { .. } => "HARDWARE_ERROR",
            Self::ChannelClosed(_) => "CHANNEL_CLOSED",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
