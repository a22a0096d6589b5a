//! Barcode scanner platform bridge.
//!
//! Connects the vendor scan device to an application layer through two
//! channels:
//!
//! - a request/response **control channel** ([`dispatcher`]) issuing device
//!   commands against the current [`DeviceHandle`](infrascan_hardware::DeviceHandle);
//! - a push **event stream** ([`event_bridge`]) turning scan broadcasts into
//!   [`ScanEvent`](infrascan_core::ScanEvent)s for a single subscriber.
//!
//! The [`lifecycle`] coordinator re-acquires the device across host
//! transitions, and [`plugin`] runs all of it on one tokio task.
//!
//! # Modules
//!
//! - [`intent`]: broadcast notifications and filters
//! - [`transport`]: broadcast transport trait and in-process bus
//! - [`decode`]: broadcast to scan event decoding
//! - [`sink`]: subscriber channel
//! - [`event_bridge`]: the event delivery core
//! - [`dispatcher`]: control-channel routing
//! - [`lifecycle`]: host lifecycle handling
//! - [`config`]: runtime configuration
//! - [`plugin`]: the plugin runtime

pub mod config;
pub mod decode;
pub mod dispatcher;
pub mod event_bridge;
pub mod intent;
pub mod lifecycle;
pub mod plugin;
pub mod sink;
pub mod transport;

pub use config::BridgeConfig;
pub use dispatcher::{Command, MethodCall, MethodResult, dispatch};
pub use event_bridge::{BridgeState, BridgeStats, EventBridge};
pub use intent::{Extra, Intent, IntentFilter};
pub use lifecycle::{LifecycleCoordinator, LifecycleEvent};
pub use plugin::{PluginHandle, PluginStatus, ScannerPlugin};
pub use sink::{DeliveryStats, EventSink, ReceiverError, ScanStream, StreamItem};
pub use transport::{BroadcastReceiver, BroadcastTransport, LocalBroadcastBus, RegistrationForm};
