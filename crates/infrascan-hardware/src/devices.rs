//! Enum wrapper for scan device dispatch.
//!
//! Native `async fn` in traits (RPITIT - Rust Edition 2024) are not
//! object-safe, so `Box<dyn ScanDevice>` is not available. [`AnyScanDevice`]
//! provides concrete type dispatch instead, which keeps the
//! [`DeviceHandle`](crate::handle::DeviceHandle) free of generics while still
//! monomorphizing every call.
//!
//! # Examples
//!
//! ```
//! use infrascan_hardware::devices::AnyScanDevice;
//! use infrascan_hardware::mock::MockScanDevice;
//!
//! let (device, _handle) = MockScanDevice::new();
//! let any_device = AnyScanDevice::Mock(device);
//! ```

use crate::Result;
use crate::mock::MockScanDevice;
use crate::traits::ScanDevice;
use infrascan_core::{LaserMode, OutputMode};

/// Enum wrapper for scan device dispatch.
///
/// # Examples
///
/// ```
/// use infrascan_hardware::devices::AnyScanDevice;
/// use infrascan_hardware::traits::ScanDevice;
/// use infrascan_hardware::mock::MockScanDevice;
///
/// #[tokio::main]
/// async fn main() -> infrascan_hardware::Result<()> {
///     let (device, _handle) = MockScanDevice::new();
///     let mut any_device = AnyScanDevice::Mock(device);
///
///     assert!(any_device.open_scan().await?);
///     assert!(any_device.is_scan_opened().await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyScanDevice {
    /// Simulated scanner for development and testing.
    Mock(MockScanDevice),
}

impl ScanDevice for AnyScanDevice {
    async fn is_scan_opened(&self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.is_scan_opened().await,
        }
    }

    async fn open_scan(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.open_scan().await,
        }
    }

    async fn close_scan(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.close_scan().await,
        }
    }

    async fn start_scan(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.start_scan().await,
        }
    }

    async fn stop_scan(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.stop_scan().await,
        }
    }

    async fn reset_scan(&mut self) -> Result<bool> {
        match self {
            Self::Mock(device) => device.reset_scan().await,
        }
    }

    async fn set_scan_laser_mode(&mut self, mode: LaserMode) -> Result<()> {
        match self {
            Self::Mock(device) => device.set_scan_laser_mode(mode).await,
        }
    }

    async fn set_out_scan_mode(&mut self, mode: OutputMode) -> Result<bool> {
        match self {
            Self::Mock(device) => device.set_out_scan_mode(mode).await,
        }
    }

    async fn out_scan_mode(&self) -> Result<OutputMode> {
        match self {
            Self::Mock(device) => device.out_scan_mode().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_device_dispatches_to_mock() {
        let (device, handle) = MockScanDevice::new();
        let mut any_device = AnyScanDevice::Mock(device);

        assert!(any_device.open_scan().await.unwrap());
        any_device
            .set_scan_laser_mode(LaserMode::Continuous)
            .await
            .unwrap();
        any_device
            .set_out_scan_mode(OutputMode::Keyboard)
            .await
            .unwrap();

        let state = handle.state();
        assert!(state.opened);
        assert_eq!(state.laser_mode, Some(LaserMode::Continuous));
        assert_eq!(
            any_device.out_scan_mode().await.unwrap(),
            OutputMode::Keyboard
        );
    }
}
