//! End-to-end tests of the plugin runtime.
//!
//! Each test drives a plugin the way a host application would: lifecycle
//! transitions, control-channel calls, and an event subscription fed by
//! broadcasts from the simulated vendor service.

mod common;

use futures::StreamExt;
use infrascan_bridge::config::BridgeConfig;
use infrascan_bridge::dispatcher::{METHODS, MethodCall, MethodResult};
use infrascan_bridge::event_bridge::BridgeState;
use infrascan_bridge::intent::Intent;
use infrascan_bridge::lifecycle::LifecycleEvent;
use infrascan_bridge::transport::{LocalBroadcastBus, RegistrationForm};
use infrascan_core::LaserMode;
use infrascan_core::constants::{EXTRA_BARCODE, EXTRA_LENGTH, SCAN_ACTION};
use infrascan_hardware::{MockDeviceFactory, ScanOperation};
use serde_json::json;

// ============================================================================
// Event stream
// ============================================================================

#[tokio::test]
async fn test_reference_scan_payload() {
    let h = common::start();
    let mut stream = h.plugin.listen().await.unwrap();

    h.bus
        .send_broadcast(common::scan_intent(&[0x41, 0x42, 0x43], 3, "CODE128", "]C1"));

    let event = stream.next().await.unwrap().unwrap();
    assert_eq!(
        serde_json::to_value(&event).unwrap(),
        json!({
            "code": "ABC",
            "length": 3,
            "barcodeType": "CODE128",
            "aimId": "]C1",
            "raw": [65, 66, 67],
        })
    );
}

#[tokio::test]
async fn test_events_arrive_in_broadcast_order() {
    let h = common::start();
    let mut stream = h.plugin.listen().await.unwrap();

    let codes: Vec<String> = (0..20).map(|n| format!("CODE-{n:02}")).collect();
    for code in &codes {
        assert_eq!(h.bus.send_broadcast(common::code_intent(code)), 1);
    }

    for code in &codes {
        assert_eq!(&stream.recv().await.unwrap().unwrap().code, code);
    }
    assert_eq!(h.plugin.status().await.unwrap().stats.delivered, 20);
}

#[tokio::test]
async fn test_subscribe_unsubscribe_subscribe() {
    let h = common::start();

    let mut first = h.plugin.listen().await.unwrap();
    assert_eq!(h.bus.registration_count(), 1);

    h.plugin.cancel().await.unwrap();
    assert_eq!(h.bus.registration_count(), 0);
    assert!(first.recv().await.is_none());
    assert_eq!(h.bus.send_broadcast(common::code_intent("lost")), 0);

    let mut second = h.plugin.listen().await.unwrap();
    assert_eq!(h.bus.registration_count(), 1);
    assert_eq!(h.bus.total_registrations(), 2);

    h.bus.send_broadcast(common::code_intent("back"));
    assert_eq!(second.recv().await.unwrap().unwrap().code, "back");
}

#[tokio::test]
async fn test_cancel_without_subscription_is_noop() {
    let h = common::start();

    h.plugin.cancel().await.unwrap();
    h.plugin.cancel().await.unwrap();
    assert_eq!(h.plugin.status().await.unwrap().bridge, BridgeState::Idle);
    assert_eq!(h.bus.total_registrations(), 0);
}

#[tokio::test]
async fn test_second_listen_replaces_first_without_reregistering() {
    let h = common::start();

    let mut first = h.plugin.listen().await.unwrap();
    let mut second = h.plugin.listen().await.unwrap();
    assert_eq!(h.bus.total_registrations(), 1);

    h.bus.send_broadcast(common::code_intent("only-second"));
    assert!(first.recv().await.is_none());
    assert_eq!(second.recv().await.unwrap().unwrap().code, "only-second");
}

#[tokio::test]
async fn test_dropped_stream_tears_down_registration() {
    let h = common::start();
    let stream = h.plugin.listen().await.unwrap();
    drop(stream);

    h.bus.send_broadcast(common::code_intent("nobody"));
    let status = h.plugin.status().await.unwrap();
    assert_eq!(status.bridge, BridgeState::Idle);
    assert_eq!(h.bus.registration_count(), 0);
}

#[tokio::test]
async fn test_malformed_broadcast_becomes_receiver_error() {
    let h = common::start();
    let mut stream = h.plugin.listen().await.unwrap();

    h.bus.send_broadcast(
        Intent::new(SCAN_ACTION)
            .with_bytes(EXTRA_BARCODE, b"123".to_vec())
            .with_text(EXTRA_LENGTH, "3"),
    );
    h.bus.send_broadcast(common::code_intent("after"));

    let error = stream.recv().await.unwrap().unwrap_err();
    assert_eq!(error.code, "RECEIVER_ERROR");
    assert_eq!(stream.recv().await.unwrap().unwrap().code, "after");

    let status = h.plugin.status().await.unwrap();
    assert_eq!(status.bridge, BridgeState::Listening);
    assert_eq!(status.stats.faults, 1);
}

#[tokio::test]
async fn test_registration_form_follows_sdk_level() {
    for (sdk_int, form) in [(33, RegistrationForm::NotExported), (28, RegistrationForm::Legacy)] {
        let h = common::start_with(
            BridgeConfig::default(),
            MockDeviceFactory::new(),
            LocalBroadcastBus::with_sdk_int(sdk_int),
        );
        let _stream = h.plugin.listen().await.unwrap();
        assert_eq!(h.bus.registered_forms(), vec![form], "sdk {sdk_int}");
    }
}

#[tokio::test]
async fn test_custom_scan_action() {
    let config = BridgeConfig {
        scan_action: "com.example.SCAN".to_string(),
        ..BridgeConfig::default()
    };
    let h = common::start_with(config, MockDeviceFactory::new(), LocalBroadcastBus::new());
    let mut stream = h.plugin.listen().await.unwrap();

    assert_eq!(h.bus.send_broadcast(common::code_intent("default")), 0);
    h.bus.send_broadcast(Intent::new("com.example.SCAN").with_bytes(EXTRA_BARCODE, b"X".to_vec()));
    assert_eq!(stream.recv().await.unwrap().unwrap().code, "X");
}

// ============================================================================
// Control channel
// ============================================================================

#[tokio::test]
async fn test_every_command_reports_no_sdk_without_service() {
    let h = common::start_without_service();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();

    for method in METHODS {
        let result = h.plugin.invoke(MethodCall::new(method)).await.unwrap();
        assert_eq!(result.error_code(), Some("NO_SDK"), "{method}");
    }
}

#[tokio::test]
async fn test_unknown_method_is_not_implemented_with_or_without_device() {
    let h = common::start();
    let call = MethodCall::new("toggleTorch");

    assert_eq!(h.plugin.invoke(call.clone()).await.unwrap(), MethodResult::NotImplemented);
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();
    assert_eq!(h.plugin.invoke(call).await.unwrap(), MethodResult::NotImplemented);
}

#[tokio::test]
async fn test_set_continuous_maps_to_laser_codes() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();

    for (on, code) in [(true, 4), (false, 8)] {
        let call = MethodCall::new("setContinuous").with_arguments(json!({ "on": on }));
        let result = h.plugin.invoke(call).await.unwrap();
        assert_eq!(result, MethodResult::Success(serde_json::Value::Null));
        assert_eq!(h.engine.state().laser_mode.map(|mode| mode.code()), Some(code));
    }
    assert_eq!(h.engine.state().laser_mode, Some(LaserMode::Single));
}

#[tokio::test]
async fn test_fault_defaults_are_asymmetric() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();
    h.engine.fail(ScanOperation::OpenScan);
    h.engine.fail(ScanOperation::SetOutScanMode);

    let open = h.plugin.invoke(MethodCall::new("openScan")).await.unwrap();
    assert_eq!(open, MethodResult::Success(json!(false)));

    let set_mode = MethodCall::new("setOutScanMode").with_arguments(json!({ "mode": 2 }));
    let set_mode = h.plugin.invoke(set_mode).await.unwrap();
    assert_eq!(set_mode, MethodResult::Success(json!(true)));
}

#[tokio::test]
async fn test_invalid_mode_argument() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();

    let call = MethodCall::new("setOutScanMode").with_arguments(json!({ "mode": 7 }));
    let result = h.plugin.invoke(call).await.unwrap();
    assert_eq!(result.error_code(), Some("INVALID_ARGUMENT"));
}

#[tokio::test]
async fn test_scan_session() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();

    for method in ["openScan", "isScanOpened", "startScan"] {
        let result = h.plugin.invoke(MethodCall::new(method)).await.unwrap();
        assert_eq!(result, MethodResult::Success(json!(true)), "{method}");
    }
    assert!(h.engine.state().scanning);

    let mode = h.plugin.invoke(MethodCall::new("getOutScanMode")).await.unwrap();
    assert_eq!(mode, MethodResult::Success(json!(0)));

    let status = h.plugin.status().await.unwrap();
    assert!(status.device.unwrap().open);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_detach_removes_device_but_keeps_subscription() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();
    let mut stream = h.plugin.listen().await.unwrap();

    h.plugin.lifecycle(LifecycleEvent::Detached).await.unwrap();
    let result = h.plugin.invoke(MethodCall::new("openScan")).await.unwrap();
    assert_eq!(result.error_code(), Some("NO_SDK"));

    h.bus.send_broadcast(common::code_intent("still-here"));
    assert_eq!(stream.recv().await.unwrap().unwrap().code, "still-here");
    assert_eq!(h.bus.total_registrations(), 1);
}

#[tokio::test]
async fn test_configuration_change_keeps_device() {
    let h = common::start();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();
    h.plugin.invoke(MethodCall::new("openScan")).await.unwrap();

    h.plugin
        .lifecycle(LifecycleEvent::DetachedForConfigChanges)
        .await
        .unwrap();
    let status = h.plugin.status().await.unwrap();
    assert!(!status.attached);
    assert!(status.device.unwrap().open);

    h.plugin
        .lifecycle(LifecycleEvent::ReattachedForConfigChanges)
        .await
        .unwrap();
    assert_eq!(h.engine.instances_created(), 1);
    let result = h.plugin.invoke(MethodCall::new("isScanOpened")).await.unwrap();
    assert_eq!(result, MethodResult::Success(json!(true)));
}

#[tokio::test]
async fn test_service_installed_later_is_picked_up_on_attach() {
    let h = common::start_without_service();
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();
    assert!(h.plugin.status().await.unwrap().device.is_none());

    h.engine.set_service_installed(true);
    h.plugin.lifecycle(LifecycleEvent::Attached).await.unwrap();

    let result = h.plugin.invoke(MethodCall::new("openScan")).await.unwrap();
    assert_eq!(result, MethodResult::Success(json!(true)));
    assert_eq!(h.engine.state().output_mode.as_i32(), 0);
}

#[tokio::test]
async fn test_shutdown_releases_registration() {
    let h = common::start();
    let _stream = h.plugin.listen().await.unwrap();

    h.plugin.shutdown().await.unwrap();
    assert_eq!(h.bus.registration_count(), 0);
    assert_eq!(h.bus.send_broadcast(common::code_intent("late")), 0);
}
