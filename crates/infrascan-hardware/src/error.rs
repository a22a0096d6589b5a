//! Error types for scan device operations.
//!
//! These errors describe what went wrong inside a single call to the vendor
//! scan SDK. They never reach the application layer directly: the
//! [`DeviceHandle`](crate::handle::DeviceHandle) converts every one of them
//! into a default value.

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during scan device operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The vendor scan service is not installed or not running.
    #[error("Scan service unavailable: {service}")]
    ServiceUnavailable { service: String },

    /// Device is not connected or has been disconnected.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// The SDK threw while executing the call.
    #[error("Call `{operation}` faulted: {message}")]
    CallFaulted { operation: String, message: String },

    /// Device returned a value the bridge cannot interpret.
    #[error("Invalid data: {message}")]
    InvalidData { message: String },
}

impl HardwareError {
    /// Create a new service unavailable error.
    pub fn service_unavailable(service: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new call faulted error.
    pub fn call_faulted(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CallFaulted {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid data error.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }
}
