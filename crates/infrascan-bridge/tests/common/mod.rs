//! Common test utilities for bridge integration tests.
//!
//! Every test gets a fresh plugin wired to a mock scan engine and an
//! in-process broadcast bus. The helpers return all three so a test can drive
//! the plugin, inject faults into the engine, and play the vendor service by
//! sending broadcasts.

#![allow(dead_code)]

use infrascan_bridge::config::BridgeConfig;
use infrascan_bridge::intent::Intent;
use infrascan_bridge::plugin::{PluginHandle, ScannerPlugin};
use infrascan_bridge::transport::LocalBroadcastBus;
use infrascan_core::constants::{
    EXTRA_AIM_ID, EXTRA_BARCODE, EXTRA_BARCODE_TYPE, EXTRA_LENGTH, SCAN_ACTION,
};
use infrascan_hardware::{MockDeviceFactory, MockScannerHandle};
use std::sync::Arc;

/// A running plugin and the collaborators it was built from.
pub struct Harness {
    pub plugin: PluginHandle,
    pub engine: MockScannerHandle,
    pub bus: Arc<LocalBroadcastBus>,
}

/// Start a plugin with the vendor service installed.
pub fn start() -> Harness {
    start_with(BridgeConfig::default(), MockDeviceFactory::new(), LocalBroadcastBus::new())
}

/// Start a plugin whose vendor service is missing.
pub fn start_without_service() -> Harness {
    start_with(
        BridgeConfig::default(),
        MockDeviceFactory::unavailable(),
        LocalBroadcastBus::new(),
    )
}

pub fn start_with(
    config: BridgeConfig,
    (factory, engine): (MockDeviceFactory, MockScannerHandle),
    bus: LocalBroadcastBus,
) -> Harness {
    let bus = Arc::new(bus);
    let plugin = ScannerPlugin::new(config, Arc::new(factory), bus.clone())
        .start()
        .expect("valid test configuration");
    Harness {
        plugin,
        engine,
        bus,
    }
}

/// Broadcast shaped the way the vendor scan service sends it.
pub fn scan_intent(raw: &[u8], length: i32, symbology: &str, aim_id: &str) -> Intent {
    Intent::new(SCAN_ACTION)
        .with_bytes(EXTRA_BARCODE, raw.to_vec())
        .with_int(EXTRA_LENGTH, length)
        .with_text(EXTRA_BARCODE_TYPE, symbology)
        .with_text(EXTRA_AIM_ID, aim_id)
}

/// Simple broadcast carrying an ASCII code.
pub fn code_intent(code: &str) -> Intent {
    let length = i32::try_from(code.len()).expect("test code fits an int extra");
    scan_intent(code.as_bytes(), length, "CODE128", "]C0")
}
