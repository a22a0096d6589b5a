//! Mock scan engine implementation for testing and development.
//!
//! The mock keeps its state behind a shared cell so that a
//! [`MockScannerHandle`] can observe every call and inject faults while the
//! device itself is owned by the bridge. All devices created by one
//! [`MockDeviceFactory`] share that state, the same way successive vendor
//! `ScanDevice` instances drive the same physical engine.

use crate::{
    HardwareError, Result,
    devices::AnyScanDevice,
    traits::{ScanDevice, ScanDeviceFactory},
};
use infrascan_core::{LaserMode, OutputMode};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Operations exposed by the scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanOperation {
    IsScanOpened,
    OpenScan,
    CloseScan,
    StartScan,
    StopScan,
    ResetScan,
    SetScanLaserMode,
    SetOutScanMode,
    OutScanMode,
}

impl ScanOperation {
    /// Vendor SDK method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::IsScanOpened => "isScanOpened",
            Self::OpenScan => "openScan",
            Self::CloseScan => "closeScan",
            Self::StartScan => "startScan",
            Self::StopScan => "stopScan",
            Self::ResetScan => "resetScan",
            Self::SetScanLaserMode => "setScanLaserMode",
            Self::SetOutScanMode => "setOutScanMode",
            Self::OutScanMode => "getOutScanMode",
        }
    }
}

impl fmt::Display for ScanOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observable state of the simulated engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockScannerState {
    /// Engine powered on.
    pub opened: bool,

    /// Decoding in progress.
    pub scanning: bool,

    /// Last laser mode applied, `None` until set or after a reset.
    pub laser_mode: Option<LaserMode>,

    /// Current output mode.
    pub output_mode: OutputMode,

    /// Number of successful resets.
    pub reset_count: u32,

    /// Every call that reached the engine, in order.
    pub calls: Vec<ScanOperation>,
}

impl Default for MockScannerState {
    fn default() -> Self {
        Self {
            opened: false,
            scanning: false,
            laser_mode: None,
            output_mode: OutputMode::default(),
            reset_count: 0,
            calls: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Shared {
    state: MockScannerState,
    faulting: HashSet<ScanOperation>,
    rejecting: HashSet<ScanOperation>,
    service_installed: bool,
    disconnected: bool,
    reported_mode_code: Option<i32>,
    instances_created: usize,
}

impl Default for Shared {
    fn default() -> Self {
        Self {
            state: MockScannerState::default(),
            faulting: HashSet::new(),
            rejecting: HashSet::new(),
            service_installed: true,
            disconnected: false,
            reported_mode_code: None,
            instances_created: 0,
        }
    }
}

type SharedCell = Arc<Mutex<Shared>>;

fn lock(shared: &SharedCell) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock scan device for testing and development.
///
/// # Examples
///
/// ```
/// use infrascan_hardware::mock::MockScanDevice;
/// use infrascan_hardware::traits::ScanDevice;
///
/// #[tokio::main]
/// async fn main() -> infrascan_hardware::Result<()> {
///     let (mut device, handle) = MockScanDevice::new();
///
///     assert!(device.open_scan().await?);
///     assert!(device.start_scan().await?);
///
///     assert!(handle.state().scanning);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockScanDevice {
    shared: SharedCell,
    name: String,
}

impl MockScanDevice {
    /// Create a new mock scan device with the default name.
    ///
    /// Returns the device and a handle that observes and controls it.
    pub fn new() -> (Self, MockScannerHandle) {
        Self::with_name("Mock Scan Engine".to_string())
    }

    /// Create a new mock scan device with a custom name.
    pub fn with_name(name: String) -> (Self, MockScannerHandle) {
        let shared: SharedCell = Arc::default();
        lock(&shared).instances_created = 1;

        let device = Self {
            shared: Arc::clone(&shared),
            name: name.clone(),
        };
        let handle = MockScannerHandle { shared, name };

        (device, handle)
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record the call and apply any injected failure.
    ///
    /// Returns `Ok(false)` when the operation is configured to be rejected by
    /// the SDK, `Ok(true)` when it should proceed.
    fn enter(&self, shared: &mut Shared, operation: ScanOperation) -> Result<bool> {
        if shared.disconnected {
            return Err(HardwareError::disconnected(self.name.clone()));
        }
        shared.state.calls.push(operation);
        if shared.faulting.contains(&operation) {
            return Err(HardwareError::call_faulted(
                operation.name(),
                "simulated SDK exception",
            ));
        }
        Ok(!shared.rejecting.contains(&operation))
    }
}

impl ScanDevice for MockScanDevice {
    async fn is_scan_opened(&self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        self.enter(&mut shared, ScanOperation::IsScanOpened)?;
        Ok(shared.state.opened)
    }

    async fn open_scan(&mut self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::OpenScan)? {
            return Ok(false);
        }
        shared.state.opened = true;
        Ok(true)
    }

    async fn close_scan(&mut self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::CloseScan)? {
            return Ok(false);
        }
        shared.state.opened = false;
        shared.state.scanning = false;
        Ok(true)
    }

    async fn start_scan(&mut self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::StartScan)? || !shared.state.opened {
            return Ok(false);
        }
        shared.state.scanning = true;
        Ok(true)
    }

    async fn stop_scan(&mut self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::StopScan)? {
            return Ok(false);
        }
        shared.state.scanning = false;
        Ok(true)
    }

    async fn reset_scan(&mut self) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::ResetScan)? {
            return Ok(false);
        }
        shared.state.scanning = false;
        shared.state.laser_mode = None;
        shared.state.output_mode = OutputMode::default();
        shared.state.reset_count += 1;
        Ok(true)
    }

    async fn set_scan_laser_mode(&mut self, mode: LaserMode) -> Result<()> {
        let mut shared = lock(&self.shared);
        if self.enter(&mut shared, ScanOperation::SetScanLaserMode)? {
            shared.state.laser_mode = Some(mode);
        }
        Ok(())
    }

    async fn set_out_scan_mode(&mut self, mode: OutputMode) -> Result<bool> {
        let mut shared = lock(&self.shared);
        if !self.enter(&mut shared, ScanOperation::SetOutScanMode)? {
            return Ok(false);
        }
        shared.state.output_mode = mode;
        shared.reported_mode_code = None;
        Ok(true)
    }

    async fn out_scan_mode(&self) -> Result<OutputMode> {
        let mut shared = lock(&self.shared);
        self.enter(&mut shared, ScanOperation::OutScanMode)?;
        match shared.reported_mode_code {
            Some(code) => OutputMode::try_from(code).map_err(|_| {
                HardwareError::invalid_data(format!("unknown output mode code {code}"))
            }),
            None => Ok(shared.state.output_mode),
        }
    }
}

/// Handle for observing and controlling a mock scan engine.
///
/// Cheap to clone; all clones see the same engine.
///
/// # Examples
///
/// ```
/// use infrascan_hardware::mock::{MockScanDevice, ScanOperation};
/// use infrascan_hardware::traits::ScanDevice;
///
/// #[tokio::main]
/// async fn main() {
///     let (mut device, handle) = MockScanDevice::new();
///
///     handle.fail(ScanOperation::OpenScan);
///     assert!(device.open_scan().await.is_err());
///
///     handle.recover(ScanOperation::OpenScan);
///     assert!(device.open_scan().await.unwrap());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockScannerHandle {
    shared: SharedCell,
    name: String,
}

impl MockScannerHandle {
    /// Snapshot of the engine state.
    pub fn state(&self) -> MockScannerState {
        lock(&self.shared).state.clone()
    }

    /// Calls that reached the engine, in order.
    pub fn calls(&self) -> Vec<ScanOperation> {
        lock(&self.shared).state.calls.clone()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        lock(&self.shared).state.calls.clear();
    }

    /// Make `operation` raise an SDK exception until [`recover`](Self::recover).
    pub fn fail(&self, operation: ScanOperation) {
        lock(&self.shared).faulting.insert(operation);
    }

    /// Make `operation` complete but report `false`.
    pub fn reject(&self, operation: ScanOperation) {
        lock(&self.shared).rejecting.insert(operation);
    }

    /// Clear any injected fault or rejection for `operation`.
    pub fn recover(&self, operation: ScanOperation) {
        let mut shared = lock(&self.shared);
        shared.faulting.remove(&operation);
        shared.rejecting.remove(&operation);
    }

    /// Simulate the vendor service being removed (or installed again).
    ///
    /// Only affects instantiation through [`MockDeviceFactory`].
    pub fn set_service_installed(&self, installed: bool) {
        lock(&self.shared).service_installed = installed;
    }

    /// Simulate the scan service dying under existing device instances.
    pub fn disconnect(&self) {
        lock(&self.shared).disconnected = true;
    }

    /// Undo [`disconnect`](Self::disconnect).
    pub fn reconnect(&self) {
        lock(&self.shared).disconnected = false;
    }

    /// Make the firmware report a raw output mode code.
    ///
    /// Cleared by the next successful `set_out_scan_mode`.
    pub fn report_mode_code(&self, code: i32) {
        lock(&self.shared).reported_mode_code = Some(code);
    }

    /// Number of device instances created for this engine.
    pub fn instances_created(&self) -> usize {
        lock(&self.shared).instances_created
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Factory producing mock devices bound to one simulated engine.
///
/// # Examples
///
/// ```
/// use infrascan_hardware::mock::MockDeviceFactory;
/// use infrascan_hardware::traits::ScanDeviceFactory;
///
/// let (factory, handle) = MockDeviceFactory::new();
/// assert!(factory.create().is_ok());
///
/// handle.set_service_installed(false);
/// assert!(factory.create().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MockDeviceFactory {
    shared: SharedCell,
    name: String,
}

impl MockDeviceFactory {
    /// Create a factory with the vendor service installed.
    pub fn new() -> (Self, MockScannerHandle) {
        let name = "Mock Scan Engine".to_string();
        let shared: SharedCell = Arc::default();
        let factory = Self {
            shared: Arc::clone(&shared),
            name: name.clone(),
        };
        (factory, MockScannerHandle { shared, name })
    }

    /// Create a factory whose vendor service is missing.
    pub fn unavailable() -> (Self, MockScannerHandle) {
        let (factory, handle) = Self::new();
        handle.set_service_installed(false);
        (factory, handle)
    }
}

impl ScanDeviceFactory for MockDeviceFactory {
    fn create(&self) -> Result<AnyScanDevice> {
        let mut shared = lock(&self.shared);
        if !shared.service_installed {
            return Err(HardwareError::service_unavailable(self.name.clone()));
        }
        shared.instances_created += 1;
        Ok(AnyScanDevice::Mock(MockScanDevice {
            shared: Arc::clone(&self.shared),
            name: self.name.clone(),
        }))
    }
}
