//! Best-effort wrapper around the vendor scan device.
//!
//! The vendor SDK is allowed to throw from any call. The bridge never lets
//! such a fault escape to the application layer: every call goes through
//! [`best_effort`], which turns a failure into a documented default and keeps
//! the original error next to it for logging and tests.
//!
//! # Examples
//!
//! ```
//! use infrascan_hardware::handle::DeviceHandle;
//! use infrascan_hardware::mock::{MockDeviceFactory, ScanOperation};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (factory, engine) = MockDeviceFactory::new();
//!     let mut handle = DeviceHandle::create(&factory).expect("service installed");
//!
//!     engine.fail(ScanOperation::OpenScan);
//!     let outcome = handle.open().await;
//!     assert!(outcome.is_defaulted());
//!     assert!(!outcome.into_value());
//! }
//! ```

use crate::devices::AnyScanDevice;
use crate::traits::{ScanDevice, ScanDeviceFactory};
use infrascan_core::{Error, LaserMode, OutputMode};
use serde::Serialize;
use std::future::Future;
use tracing::{debug, info, warn};

/// Result of a best-effort hardware call.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call completed and produced this value.
    Success(T),

    /// The call faulted; `value` is the documented default.
    Defaulted { value: T, error: Error },
}

impl<T> Outcome<T> {
    /// Value to report, whether real or defaulted.
    pub fn value(&self) -> &T {
        match self {
            Self::Success(value) | Self::Defaulted { value, .. } => value,
        }
    }

    /// Consume the outcome and return the value to report.
    pub fn into_value(self) -> T {
        match self {
            Self::Success(value) | Self::Defaulted { value, .. } => value,
        }
    }

    /// Whether the underlying call faulted.
    pub fn is_defaulted(&self) -> bool {
        matches!(self, Self::Defaulted { .. })
    }

    /// Fault that caused the default, if any.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Success(_) => None,
            Self::Defaulted { error, .. } => Some(error),
        }
    }
}

/// Await a hardware call, converting a failure into `default`.
///
/// The failure is logged at `warn` and kept as an
/// [`Error::HardwareCallFailure`] inside the returned [`Outcome`].
pub async fn best_effort<T, F>(operation: &'static str, call: F, default: T) -> Outcome<T>
where
    F: Future<Output = crate::Result<T>>,
{
    match call.await {
        Ok(value) => Outcome::Success(value),
        Err(error) => {
            warn!(operation, %error, "Hardware call failed, reporting default");
            Outcome::Defaulted {
                value: default,
                error: Error::hardware_call(operation, error.to_string()),
            }
        }
    }
}

/// Configuration the bridge believes the engine currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HandleSnapshot {
    /// Last confirmed open/close state.
    pub open: bool,

    /// Last requested laser behaviour.
    pub continuous: bool,

    /// Last output mode confirmed by the device.
    pub output_mode: OutputMode,
}

/// Live connection to the vendor scan engine.
#[derive(Debug)]
pub struct DeviceHandle {
    device: AnyScanDevice,
    snapshot: HandleSnapshot,
}

impl DeviceHandle {
    /// Instantiate the device through `factory`.
    ///
    /// Returns `None` when the vendor SDK or service is missing; never fails
    /// otherwise.
    pub fn create(factory: &dyn ScanDeviceFactory) -> Option<Self> {
        match factory.create() {
            Ok(device) => {
                info!("Scan device instantiated");
                Some(Self::new(device))
            }
            Err(error) => {
                warn!(%error, "Scan device unavailable");
                None
            }
        }
    }

    /// Wrap an already instantiated device.
    pub fn new(device: AnyScanDevice) -> Self {
        Self {
            device,
            snapshot: HandleSnapshot {
                open: false,
                continuous: false,
                output_mode: OutputMode::default(),
            },
        }
    }

    /// Cached view of the engine configuration.
    pub fn snapshot(&self) -> HandleSnapshot {
        self.snapshot
    }

    /// Query whether the engine is open (`false` if unreadable).
    pub async fn is_open(&self) -> Outcome<bool> {
        best_effort("isScanOpened", self.device.is_scan_opened(), false).await
    }

    /// Power on the engine (`false` on fault).
    pub async fn open(&mut self) -> Outcome<bool> {
        let outcome = best_effort("openScan", self.device.open_scan(), false).await;
        if let Outcome::Success(true) = outcome {
            self.snapshot.open = true;
        }
        outcome
    }

    /// Power off the engine (`false` on fault).
    pub async fn close(&mut self) -> Outcome<bool> {
        let outcome = best_effort("closeScan", self.device.close_scan(), false).await;
        if let Outcome::Success(true) = outcome {
            self.snapshot.open = false;
        }
        outcome
    }

    /// Start decoding (`false` on fault).
    pub async fn start(&mut self) -> Outcome<bool> {
        best_effort("startScan", self.device.start_scan(), false).await
    }

    /// Stop decoding (`false` on fault).
    pub async fn stop(&mut self) -> Outcome<bool> {
        best_effort("stopScan", self.device.stop_scan(), false).await
    }

    /// Restore factory configuration (`false` on fault).
    pub async fn reset(&mut self) -> Outcome<bool> {
        let outcome = best_effort("resetScan", self.device.reset_scan(), false).await;
        if let Outcome::Success(true) = outcome {
            self.snapshot.continuous = false;
            self.snapshot.output_mode = OutputMode::default();
        }
        outcome
    }

    /// Switch between continuous (`4`) and single-shot (`8`) laser modes.
    pub async fn set_continuous(&mut self, on: bool) -> Outcome<()> {
        let mode = LaserMode::from_continuous(on);
        debug!(on, code = mode.code(), "Setting laser mode");
        self.snapshot.continuous = on;
        best_effort("setScanLaserMode", self.device.set_scan_laser_mode(mode), ()).await
    }

    /// Select the output mode.
    ///
    /// A faulting call reports `true`: the SDK is assumed to have degraded
    /// gracefully. This differs from the open/close family, which report
    /// `false` on fault.
    pub async fn set_output_mode(&mut self, mode: OutputMode) -> Outcome<bool> {
        let outcome = best_effort("setOutScanMode", self.device.set_out_scan_mode(mode), true).await;
        if let Outcome::Success(true) = outcome {
            self.snapshot.output_mode = mode;
        }
        outcome
    }

    /// Read the output mode (broadcast if unreadable).
    pub async fn output_mode(&self) -> Outcome<OutputMode> {
        best_effort(
            "getOutScanMode",
            self.device.out_scan_mode(),
            OutputMode::default(),
        )
        .await
    }
}
