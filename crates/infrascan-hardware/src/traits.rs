//! Scan device trait definitions.
//!
//! This module defines the contract between the bridge and the vendor scan
//! SDK. The SDK is an opaque capability: it may be missing entirely (no vendor
//! service on the terminal), and any individual call may fault. Implementations
//! report both situations through [`HardwareError`](crate::HardwareError);
//! deciding what to do with a fault is left to the
//! [`DeviceHandle`](crate::handle::DeviceHandle).
//!
//! All device methods use native `async fn` (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::devices::AnyScanDevice;
use crate::error::Result;
use infrascan_core::{LaserMode, OutputMode};

/// Vendor barcode scan engine.
///
/// Mirrors the operations exposed by the vendor `ScanDevice` class. Boolean
/// results are the SDK's own success flags; an `Err` means the call itself
/// faulted.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. For dynamic dispatch use
/// [`AnyScanDevice`](crate::devices::AnyScanDevice).
///
/// # Examples
///
/// ```no_run
/// use infrascan_hardware::traits::ScanDevice;
/// use infrascan_hardware::error::Result;
///
/// async fn trigger_once<D: ScanDevice>(device: &mut D) -> Result<bool> {
///     if !device.is_scan_opened().await? {
///         device.open_scan().await?;
///     }
///     device.start_scan().await
/// }
/// ```
pub trait ScanDevice: Send + Sync {
    /// Whether the scan engine is powered and ready.
    ///
    /// # Errors
    ///
    /// Returns an error if the SDK version does not expose the status or the
    /// call faults.
    async fn is_scan_opened(&self) -> Result<bool>;

    /// Power on the scan engine.
    async fn open_scan(&mut self) -> Result<bool>;

    /// Power off the scan engine.
    async fn close_scan(&mut self) -> Result<bool>;

    /// Start decoding (equivalent to pressing the trigger).
    async fn start_scan(&mut self) -> Result<bool>;

    /// Stop decoding.
    async fn stop_scan(&mut self) -> Result<bool>;

    /// Restore the engine's factory configuration.
    async fn reset_scan(&mut self) -> Result<bool>;

    /// Select continuous or single-shot laser behaviour.
    async fn set_scan_laser_mode(&mut self, mode: LaserMode) -> Result<()>;

    /// Select how decoded results are delivered.
    async fn set_out_scan_mode(&mut self, mode: OutputMode) -> Result<bool>;

    /// Currently configured output mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the call faults or the firmware reports a code the
    /// bridge does not know.
    async fn out_scan_mode(&self) -> Result<OutputMode>;
}

/// Instantiates the vendor scan device.
///
/// Instantiation is the point where a missing vendor service shows up, so it
/// is fallible and may be retried on every host attach.
pub trait ScanDeviceFactory: Send + Sync {
    /// Create a new device instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor SDK or scan service is not present.
    fn create(&self) -> Result<AnyScanDevice>;
}
