//! Mock device implementations for testing and development.
//!
//! This module provides a simulated scan engine that can be controlled
//! programmatically without requiring a vendor terminal.

pub mod scanner;

// Re-export commonly used types
pub use scanner::{
    MockDeviceFactory, MockScanDevice, MockScannerHandle, MockScannerState, ScanOperation,
};
