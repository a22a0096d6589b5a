//! Broadcast listener with single-subscriber fan-out.
//!
//! # States
//!
//! - `Idle`: no receiver registered, no subscriber.
//! - `Listening`: exactly one receiver registration and one subscriber.
//!
//! # Transitions
//!
//! - Idle → Listening on [`subscribe`](EventBridge::subscribe)
//! - Listening → Listening on `subscribe` (sink replaced, no re-registration)
//! - Listening → Idle on [`unsubscribe`](EventBridge::unsubscribe) or when the
//!   subscriber drops its stream (see [`subscriber_closed`](EventBridge::subscriber_closed))
//!
//! Broadcasts that arrive while Idle are discarded; nothing is buffered.
//! Delivery never waits: items are queued for the sink's forwarding task, so
//! a slow subscriber cannot hold up whoever drives the bridge.

use crate::decode::decode_scan_intent;
use crate::intent::{Intent, IntentFilter};
use crate::sink::{Delivery, DeliveryStats, EventSink, ReceiverError, ScanStream};
use crate::transport::{
    BroadcastReceiver, BroadcastTransport, ReceiverId, RegistrationForm, TransportError,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Registration state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeState {
    Idle,
    Listening,
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Listening => write!(f, "Listening"),
        }
    }
}

/// Counters over the lifetime of a bridge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeStats {
    /// Matching broadcasts handed to the bridge.
    pub received: u64,

    /// Events that reached a subscriber's stream.
    pub delivered: u64,

    /// Broadcasts that failed to decode.
    pub faults: u64,

    /// Items lost to a full queue or a subscriber that did not read in time.
    pub dropped: u64,
}

/// The event delivery core.
pub struct EventBridge {
    filter: IntentFilter,
    delivery_timeout: Duration,
    transport: Arc<dyn BroadcastTransport>,
    receiver: Arc<dyn BroadcastReceiver>,
    registration: Option<ReceiverId>,
    sink: Option<EventSink>,
    received: u64,
    faults: u64,
    delivery: DeliveryStats,
}

impl EventBridge {
    /// Create an idle bridge.
    ///
    /// `receiver` is what gets registered with `transport`; it is expected to
    /// route intents back into [`on_broadcast`](Self::on_broadcast).
    /// `delivery_timeout` bounds how long a queued item waits for a slow
    /// subscriber.
    pub fn new(
        scan_action: impl Into<String>,
        delivery_timeout: Duration,
        transport: Arc<dyn BroadcastTransport>,
        receiver: Arc<dyn BroadcastReceiver>,
    ) -> Self {
        Self {
            filter: IntentFilter::new(scan_action),
            delivery_timeout,
            transport,
            receiver,
            registration: None,
            sink: None,
            received: 0,
            faults: 0,
            delivery: DeliveryStats::default(),
        }
    }

    pub fn state(&self) -> BridgeState {
        if self.registration.is_some() {
            BridgeState::Listening
        } else {
            BridgeState::Idle
        }
    }

    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            received: self.received,
            delivered: self.delivery.delivered(),
            faults: self.faults,
            dropped: self.delivery.dropped(),
        }
    }

    /// Become the only subscriber, with a stream of `buffer` items.
    ///
    /// Registers the receiver when Idle. When already Listening the previous
    /// sink is dropped, which ends the previous subscriber's stream once its
    /// queued items are through.
    ///
    /// Must be called inside a tokio runtime; the sink's forwarding task is
    /// spawned on it.
    ///
    /// # Errors
    ///
    /// Returns the transport error if registration fails; the bridge stays
    /// Idle.
    pub fn subscribe(&mut self, buffer: usize) -> Result<ScanStream, TransportError> {
        if self.registration.is_none() {
            let form = RegistrationForm::for_sdk(self.transport.sdk_int());
            let id = self.transport.register_receiver(
                Arc::clone(&self.receiver),
                self.filter.clone(),
                form,
            )?;
            debug!(%id, ?form, "Event bridge listening");
            self.registration = Some(id);
        } else {
            debug!("Replacing event subscriber");
        }

        let (sink, stream) =
            EventSink::channel(buffer, self.delivery_timeout, self.delivery.clone());
        self.sink = Some(sink);
        Ok(stream)
    }

    /// Drop the subscriber and unregister the receiver.
    ///
    /// No-op when Idle. Unregistration failures are logged and swallowed.
    pub fn unsubscribe(&mut self) {
        self.sink = None;

        let Some(id) = self.registration.take() else {
            trace!("Unsubscribe while idle");
            return;
        };

        match self.transport.unregister_receiver(id) {
            Ok(()) => debug!(%id, "Event bridge idle"),
            Err(error) => debug!(%id, %error, "Ignoring unregister failure"),
        }
    }

    /// Resolve once the current subscriber has dropped its stream.
    ///
    /// Pending forever while Idle. The caller is expected to
    /// [`unsubscribe`](Self::unsubscribe) when this resolves.
    pub async fn subscriber_closed(&self) {
        match &self.sink {
            Some(sink) => sink.closed().await,
            None => std::future::pending().await,
        }
    }

    /// Decode a broadcast and queue it for the subscriber.
    pub fn on_broadcast(&mut self, intent: Intent) {
        if !self.filter.matches(&intent) {
            trace!(action = %intent.action, "Ignoring unrelated broadcast");
            return;
        }
        self.received += 1;

        let Some(sink) = self.sink.as_ref() else {
            trace!("No subscriber, discarding scan");
            return;
        };

        let item = decode_scan_intent(&intent).map_err(|error| {
            warn!(%error, "Failed to decode scan broadcast");
            ReceiverError::new(error.to_string())
        });
        if item.is_err() {
            self.faults += 1;
        }

        match sink.deliver(item) {
            Delivery::Queued => {}
            Delivery::Dropped => warn!("Subscriber queue full, scan dropped"),
            Delivery::Closed => {
                debug!("Subscriber stream dropped, tearing down subscription");
                self.unsubscribe();
            }
        }
    }
}

impl fmt::Debug for EventBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBridge")
            .field("filter", &self.filter)
            .field("registration", &self.registration)
            .field("subscribed", &self.sink.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}
