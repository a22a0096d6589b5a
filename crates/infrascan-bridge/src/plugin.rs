//! Plugin runtime.
//!
//! The plugin owns the [`LifecycleCoordinator`] and the [`EventBridge`] on a
//! single tokio task. Control requests, lifecycle transitions and broadcast
//! deliveries all become messages in that task's mailbox, so they are
//! processed strictly one at a time and the device handle and subscriber slot
//! need no locks.
//!
//! Broadcasts never make a control request wait on the subscriber: the loop
//! only queues scan events, and each subscription's forwarding task absorbs a
//! slow reader. A broadcast that finds the mailbox full is dropped and counted
//! in [`PluginStatus::mailbox_dropped`].
//!
//! ```text
//! ┌──────────────┐  Invoke / Listen / Cancel   ┌────────────────────────┐
//! │ PluginHandle │────────────────────────────►│                        │
//! └──────────────┘  Lifecycle / Status         │       main loop        │
//!                                              │  ┌──────────────────┐  │
//! ┌──────────────┐  Broadcast(Intent)          │  │ Lifecycle        │  │
//! │  transport   │────────────────────────────►│  │ Coordinator      │  │
//! │  (receiver)  │        try_send             │  ├──────────────────┤  │
//! └──────────────┘                             │  │ Event Bridge     │──┼──► forwarder ──► ScanStream
//!                                              │  └──────────────────┘  │
//!                                              └────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use infrascan_bridge::config::BridgeConfig;
//! use infrascan_bridge::dispatcher::{MethodCall, MethodResult};
//! use infrascan_bridge::lifecycle::LifecycleEvent;
//! use infrascan_bridge::plugin::ScannerPlugin;
//! use infrascan_bridge::transport::LocalBroadcastBus;
//! use infrascan_hardware::MockDeviceFactory;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> infrascan_core::Result<()> {
//!     let (factory, _engine) = MockDeviceFactory::new();
//!     let bus = Arc::new(LocalBroadcastBus::new());
//!     let plugin = ScannerPlugin::new(BridgeConfig::default(), Arc::new(factory), bus).start()?;
//!
//!     plugin.lifecycle(LifecycleEvent::Attached).await?;
//!     let result = plugin.invoke(MethodCall::new("openScan")).await?;
//!     assert!(result.is_success());
//!
//!     plugin.shutdown().await
//! }
//! ```

use crate::config::BridgeConfig;
use crate::dispatcher::{MethodCall, MethodResult, dispatch};
use crate::event_bridge::{BridgeState, BridgeStats, EventBridge};
use crate::intent::Intent;
use crate::lifecycle::{LifecycleCoordinator, LifecycleEvent};
use crate::sink::ScanStream;
use crate::transport::{BroadcastReceiver, BroadcastTransport};
use infrascan_core::{Error, Result};
use infrascan_hardware::{HandleSnapshot, ScanDeviceFactory};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Point-in-time view of the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginStatus {
    /// Whether a host is bound.
    pub attached: bool,

    /// Cached device configuration, `None` without a device handle.
    pub device: Option<HandleSnapshot>,

    pub bridge: BridgeState,

    pub stats: BridgeStats,

    /// Broadcasts lost because the mailbox was full.
    pub mailbox_dropped: u64,
}

enum Message {
    Invoke {
        call: MethodCall,
        reply: oneshot::Sender<MethodResult>,
    },
    Listen {
        reply: oneshot::Sender<Result<ScanStream>>,
    },
    Cancel {
        reply: oneshot::Sender<()>,
    },
    Lifecycle {
        event: LifecycleEvent,
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<PluginStatus>,
    },
    Broadcast(Intent),
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Receiver registered with the transport.
///
/// Only enqueues; never blocks the delivering thread. Holds a weak sender so
/// a registration left behind cannot keep the main loop alive.
struct MailboxReceiver {
    tx: mpsc::WeakSender<Message>,
    dropped: Arc<AtomicU64>,
}

impl BroadcastReceiver for MailboxReceiver {
    fn on_receive(&self, intent: Intent) {
        let Some(tx) = self.tx.upgrade() else {
            debug!("Plugin stopped, discarding broadcast");
            return;
        };
        match tx.try_send(Message::Broadcast(intent)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Plugin mailbox full, broadcast dropped");
            }
            Err(TrySendError::Closed(_)) => debug!("Plugin stopped, discarding broadcast"),
        }
    }
}

/// Scanner plugin, ready to start.
pub struct ScannerPlugin {
    config: BridgeConfig,
    factory: Arc<dyn ScanDeviceFactory>,
    transport: Arc<dyn BroadcastTransport>,
}

impl ScannerPlugin {
    pub fn new(
        config: BridgeConfig,
        factory: Arc<dyn ScanDeviceFactory>,
        transport: Arc<dyn BroadcastTransport>,
    ) -> Self {
        Self {
            config,
            factory,
            transport,
        }
    }

    /// Spawn the main loop on the current tokio runtime.
    ///
    /// The plugin starts detached; send [`LifecycleEvent::Attached`] to
    /// acquire the device.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the configuration fails
    /// [`BridgeConfig::validate`].
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime.
    pub fn start(self) -> Result<PluginHandle> {
        self.config.validate()?;
        let (tx, rx) = mpsc::channel(self.config.mailbox_capacity);

        let mailbox_dropped = Arc::new(AtomicU64::new(0));
        let receiver = Arc::new(MailboxReceiver {
            tx: tx.downgrade(),
            dropped: Arc::clone(&mailbox_dropped),
        });
        let bridge = EventBridge::new(
            self.config.scan_action.clone(),
            self.config.delivery_timeout(),
            self.transport,
            receiver,
        );
        let lifecycle =
            LifecycleCoordinator::new(self.factory, self.config.force_broadcast_on_attach);

        let main_loop = MainLoop {
            event_buffer: self.config.event_buffer,
            lifecycle,
            bridge,
            mailbox_dropped,
        };
        let task = tokio::spawn(main_loop.run(rx));
        info!(action = %self.config.scan_action, "Scanner plugin started");

        Ok(PluginHandle { tx, task })
    }
}

struct MainLoop {
    event_buffer: usize,
    lifecycle: LifecycleCoordinator,
    bridge: EventBridge,
    mailbox_dropped: Arc<AtomicU64>,
}

enum Wake {
    Message(Option<Message>),
    SubscriberGone,
}

impl MainLoop {
    async fn run(mut self, mut rx: mpsc::Receiver<Message>) {
        loop {
            // A dropped stream is torn down before the next message is seen.
            let wake = tokio::select! {
                biased;
                () = self.bridge.subscriber_closed() => Wake::SubscriberGone,
                message = rx.recv() => Wake::Message(message),
            };
            let message = match wake {
                Wake::SubscriberGone => {
                    debug!("Subscriber stream dropped, tearing down subscription");
                    self.bridge.unsubscribe();
                    continue;
                }
                Wake::Message(Some(message)) => message,
                Wake::Message(None) => break,
            };

            match message {
                Message::Invoke { call, reply } => {
                    let result = dispatch(self.lifecycle.handle_mut(), &call).await;
                    let _ = reply.send(result);
                }
                Message::Listen { reply } => {
                    let result = self
                        .bridge
                        .subscribe(self.event_buffer)
                        .map_err(|error| Error::ReceiverFault(error.to_string()));
                    let _ = reply.send(result);
                }
                Message::Cancel { reply } => {
                    self.bridge.unsubscribe();
                    let _ = reply.send(());
                }
                Message::Lifecycle { event, reply } => {
                    self.lifecycle.handle_event(event).await;
                    let _ = reply.send(());
                }
                Message::Status { reply } => {
                    let _ = reply.send(self.status());
                }
                Message::Broadcast(intent) => {
                    self.bridge.on_broadcast(intent);
                }
                Message::Shutdown { reply } => {
                    self.bridge.unsubscribe();
                    info!("Scanner plugin stopped");
                    let _ = reply.send(());
                    return;
                }
            }
        }

        debug!("All plugin handles dropped");
        self.bridge.unsubscribe();
    }

    fn status(&self) -> PluginStatus {
        PluginStatus {
            attached: self.lifecycle.is_attached(),
            device: self.lifecycle.snapshot(),
            bridge: self.bridge.state(),
            stats: self.bridge.stats(),
            mailbox_dropped: self.mailbox_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Handle to a running plugin.
///
/// Dropping the handle stops the main loop once queued messages are drained.
#[derive(Debug)]
pub struct PluginHandle {
    tx: mpsc::Sender<Message>,
    task: JoinHandle<()>,
}

impl PluginHandle {
    async fn request<T>(&self, message: impl FnOnce(oneshot::Sender<T>) -> Message) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(message(reply))
            .await
            .map_err(|_| Error::ChannelClosed("plugin main loop stopped".to_string()))?;
        response
            .await
            .map_err(|_| Error::ChannelClosed("plugin main loop dropped the request".to_string()))
    }

    /// Run a control-channel method.
    ///
    /// # Errors
    ///
    /// Only [`Error::ChannelClosed`]; method failures are in the
    /// [`MethodResult`].
    pub async fn invoke(&self, call: MethodCall) -> Result<MethodResult> {
        self.request(|reply| Message::Invoke { call, reply }).await
    }

    /// Become the event subscriber, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`Error::ReceiverFault`] if the transport refuses the registration.
    pub async fn listen(&self) -> Result<ScanStream> {
        self.request(|reply| Message::Listen { reply }).await?
    }

    /// Drop the current subscriber, if any.
    pub async fn cancel(&self) -> Result<()> {
        self.request(|reply| Message::Cancel { reply }).await
    }

    /// Report a host lifecycle transition.
    pub async fn lifecycle(&self, event: LifecycleEvent) -> Result<()> {
        self.request(|reply| Message::Lifecycle { event, reply }).await
    }

    pub async fn status(&self) -> Result<PluginStatus> {
        self.request(|reply| Message::Status { reply }).await
    }

    /// Unsubscribe, stop the main loop and wait for it to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.request(|reply| Message::Shutdown { reply }).await?;
        self.task
            .await
            .map_err(|error| Error::ChannelClosed(format!("plugin main loop failed: {error}")))
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Invoke { .. } => "Invoke",
            Self::Listen { .. } => "Listen",
            Self::Cancel { .. } => "Cancel",
            Self::Lifecycle { .. } => "Lifecycle",
            Self::Status { .. } => "Status",
            Self::Broadcast(_) => "Broadcast",
            Self::Shutdown { .. } => "Shutdown",
        };
        f.write_str(name)
    }
}
