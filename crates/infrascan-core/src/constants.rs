//! Core constants for the scan broadcast contract and the control surface.
//!
//! This module defines the identifiers shared between the vendor scan service,
//! the event bridge and the command dispatcher. They are fixed by the vendor
//! firmware and by the application-facing channel contract, so changing them
//! breaks compatibility with deployed devices.
//!
//! # Broadcast Contract
//!
//! The vendor service announces every decoded barcode as a broadcast:
//!
//! ```text
//! action: scan.rcv.message
//! extras:
//!   barocode     bytes   raw payload (vendor spelling)
//!   length       int     number of meaningful bytes
//!   barcodeType  text    symbology name
//!   aimid        text    AIM identifier
//! ```
//!
//! # Usage
//!
//! ```
//! use infrascan_core::constants::*;
//!
//! assert_eq!(SCAN_ACTION, "scan.rcv.message");
//! assert_eq!(EXTRA_BARCODE, "barocode");
//! assert_eq!(LASER_MODE_CONTINUOUS, 4);
//! ```

// ============================================================================
// Broadcast Contract
// ============================================================================

/// Broadcast action used by the vendor scan service when output mode is
/// broadcast.
pub const SCAN_ACTION: &str = "scan.rcv.message";

/// Extra carrying the raw barcode bytes.
///
/// The misspelling is part of the vendor contract and must be kept.
pub const EXTRA_BARCODE: &str = "barocode";

/// Extra carrying the number of meaningful bytes in [`EXTRA_BARCODE`].
pub const EXTRA_LENGTH: &str = "length";

/// Extra carrying the symbology name (e.g. `CODE128`).
pub const EXTRA_BARCODE_TYPE: &str = "barcodeType";

/// Extra carrying the AIM identifier (e.g. `]C1`).
pub const EXTRA_AIM_ID: &str = "aimid";

/// First platform SDK level that requires receivers to declare their export
/// visibility explicitly.
pub const EXPORT_DECLARATION_MIN_SDK: u32 = 33;

// ============================================================================
// Scanner Modes
// ============================================================================

/// Vendor laser mode constant for continuous scanning.
///
/// # Examples
///
/// ```
/// use infrascan_core::constants::{LASER_MODE_CONTINUOUS, LASER_MODE_SINGLE};
///
/// let code = |on: bool| if on { LASER_MODE_CONTINUOUS } else { LASER_MODE_SINGLE };
/// assert_eq!(code(true), 4);
/// assert_eq!(code(false), 8);
/// ```
pub const LASER_MODE_CONTINUOUS: i32 = 4;

/// Vendor laser mode constant for single-shot (trigger) scanning.
pub const LASER_MODE_SINGLE: i32 = 8;

/// Output mode reported when the device cannot be queried (broadcast).
pub const DEFAULT_OUTPUT_MODE: i32 = 0;

// ============================================================================
// Error Codes
// ============================================================================

/// Error code returned by the control surface when no scan device is bound.
pub const ERROR_CODE_NO_SDK: &str = "NO_SDK";

/// Error code emitted on the event stream when a broadcast cannot be decoded
/// or delivered.
pub const ERROR_CODE_RECEIVER: &str = "RECEIVER_ERROR";

/// Error code returned when a command argument has the wrong type or range.
pub const ERROR_CODE_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";

// ============================================================================
// Runtime Defaults
// ============================================================================

/// Default capacity of the subscriber's event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Default capacity of the plugin main-loop mailbox.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 128;

/// Default time the bridge waits on a full subscriber channel before dropping
/// an event (milliseconds).
pub const DEFAULT_DELIVERY_TIMEOUT_MS: u64 = 250;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_laser_modes_are_distinct() {
        assert_ne!(LASER_MODE_CONTINUOUS, LASER_MODE_SINGLE);
    }

    #[test]
    fn test_default_output_mode_is_broadcast() {
        assert_eq!(crate::OutputMode::default().as_i32(), DEFAULT_OUTPUT_MODE);
    }

    #[test]
    fn test_extras_are_distinct() {
        let extras = [
            EXTRA_BARCODE,
            EXTRA_LENGTH,
            EXTRA_BARCODE_TYPE,
            EXTRA_AIM_ID,
        ];
        for (i, a) in extras.iter().enumerate() {
            for b in &extras[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
