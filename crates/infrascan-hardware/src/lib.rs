//! Scan device abstraction layer for the infrascan bridge.
//!
//! This crate wraps the vendor barcode scan SDK behind a trait so the bridge
//! can run against the real engine on a terminal and against a mock anywhere
//! else. The SDK is treated as an opaque capability: it may be missing, and
//! any call may fault.
//!
//! # Design Philosophy
//!
//! - **Async-first**: device methods are native `async fn` in traits
//!   (Rust 1.90 + Edition 2024 RPITIT).
//! - **Enum dispatch**: [`AnyScanDevice`] replaces `Box<dyn ScanDevice>`,
//!   which RPITIT traits cannot provide.
//! - **Never raise**: [`DeviceHandle`] routes every call through
//!   [`best_effort`](handle::best_effort) and reports defaults instead of
//!   errors.
//!
//! # Example
//!
//! ```
//! use infrascan_hardware::{DeviceHandle, MockDeviceFactory};
//! use infrascan_core::OutputMode;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (factory, engine) = MockDeviceFactory::new();
//!     let mut handle = DeviceHandle::create(&factory).expect("service installed");
//!
//!     assert!(handle.open().await.into_value());
//!     handle.set_output_mode(OutputMode::Broadcast).await;
//!     assert!(engine.state().opened);
//! }
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a simulated engine with fault injection for
//! tests and for the simulator binary.
//!
//! [`AnyScanDevice`]: devices::AnyScanDevice
//! [`DeviceHandle`]: handle::DeviceHandle

pub mod devices;
pub mod error;
pub mod handle;
pub mod mock;
pub mod traits;

// Re-export commonly used types for convenience
pub use devices::AnyScanDevice;
pub use error::{HardwareError, Result};
pub use handle::{DeviceHandle, HandleSnapshot, Outcome, best_effort};
pub use mock::{MockDeviceFactory, MockScanDevice, MockScannerHandle, ScanOperation};
pub use traits::{ScanDevice, ScanDeviceFactory};
