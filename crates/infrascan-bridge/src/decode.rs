//! Decoding of scan broadcasts into [`ScanEvent`]s.
//!
//! Decoding is total over well-typed extras: missing extras take defaults, the
//! declared length is clamped to the payload, and bytes that are not UTF-8 are
//! mapped one byte per character (ISO-8859-1). The only failure is an extra
//! present with the wrong type.
//!
//! # Examples
//!
//! ```
//! use infrascan_bridge::decode::decode_scan_intent;
//! use infrascan_bridge::intent::Intent;
//!
//! let intent = Intent::new("scan.rcv.message")
//!     .with_bytes("barocode", vec![0x41, 0x42, 0x43])
//!     .with_int("length", 3)
//!     .with_text("barcodeType", "CODE128")
//!     .with_text("aimid", "]C1");
//!
//! let event = decode_scan_intent(&intent).unwrap();
//! assert_eq!(event.code, "ABC");
//! assert_eq!(event.symbology, "CODE128");
//! assert_eq!(event.aim_id, "]C1");
//! ```

use crate::intent::{ExtraTypeError, Intent};
use bytes::Bytes;
use infrascan_core::ScanEvent;
use infrascan_core::constants::{EXTRA_AIM_ID, EXTRA_BARCODE, EXTRA_BARCODE_TYPE, EXTRA_LENGTH};

/// Number of payload bytes to decode.
///
/// An absent length means the whole payload; a declared length is clamped to
/// `[0, raw_len]`.
///
/// ```
/// use infrascan_bridge::decode::effective_length;
///
/// assert_eq!(effective_length(5, None), 5);
/// assert_eq!(effective_length(5, Some(99)), 5);
/// assert_eq!(effective_length(5, Some(-1)), 0);
/// ```
pub fn effective_length(raw_len: usize, declared: Option<i32>) -> usize {
    match declared {
        None => raw_len,
        Some(length) => usize::try_from(length).unwrap_or(0).min(raw_len),
    }
}

/// Decode the first `length` bytes of `raw` as text.
///
/// Valid UTF-8 is decoded as such; anything else falls back to a one byte per
/// character mapping so the event is never lost. Bytes past `length` are
/// never read.
pub fn decode_text(raw: &[u8], length: usize) -> String {
    let prefix = &raw[..length.min(raw.len())];
    match std::str::from_utf8(prefix) {
        Ok(text) => text.to_owned(),
        Err(_) => prefix.iter().copied().map(char::from).collect(),
    }
}

/// Build a [`ScanEvent`] from a scan broadcast.
///
/// # Errors
///
/// Returns an error if one of the scan extras is present with an unexpected
/// type.
pub fn decode_scan_intent(intent: &Intent) -> Result<ScanEvent, ExtraTypeError> {
    let raw = intent.bytes_extra(EXTRA_BARCODE)?.cloned().unwrap_or_else(Bytes::new);
    let length = effective_length(raw.len(), intent.int_extra(EXTRA_LENGTH)?);
    let symbology = intent
        .text_extra(EXTRA_BARCODE_TYPE)?
        .unwrap_or_default()
        .to_owned();
    let aim_id = intent.text_extra(EXTRA_AIM_ID)?.unwrap_or_default().to_owned();
    let code = decode_text(&raw, length);

    Ok(ScanEvent {
        code,
        length,
        symbology,
        aim_id,
        raw,
    })
}
