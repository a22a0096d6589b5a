//! Subscriber side of the event stream.
//!
//! [`EventSink::channel`] creates a bounded channel whose receiving half, a
//! [`ScanStream`], is handed to the subscriber. The sending half is driven by
//! a forwarding task: the event bridge only queues items for it and never
//! waits, while the task waits up to the delivery timeout for a slow
//! subscriber and drops what does not fit.
//!
//! ```text
//! EventSink ──try_send──► queue ──► forwarder ──send_timeout──► ScanStream
//! ```
//!
//! Dropping the stream closes the channel; [`EventSink::closed`] resolves and
//! the forwarding task exits.

use futures::Stream;
use infrascan_core::ScanEvent;
use infrascan_core::constants::ERROR_CODE_RECEIVER;
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};
use tracing::{trace, warn};

/// Error notification delivered on the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ReceiverError {
    /// Always `RECEIVER_ERROR`.
    pub code: &'static str,

    /// Description of the fault.
    pub message: String,
}

impl ReceiverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: ERROR_CODE_RECEIVER,
            message: message.into(),
        }
    }
}

/// One item on the event stream.
pub type StreamItem = Result<ScanEvent, ReceiverError>;

/// What happened to an item handed to [`EventSink::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The item is queued for the forwarding task.
    Queued,

    /// The queue was full; the item is gone.
    Dropped,

    /// The subscriber dropped its stream.
    Closed,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

/// Delivery counters shared between a bridge and the forwarding tasks of
/// its sinks.
#[derive(Debug, Clone, Default)]
pub struct DeliveryStats(Arc<Counters>);

impl DeliveryStats {
    /// Scan events that reached a subscriber channel.
    pub fn delivered(&self) -> u64 {
        self.0.delivered.load(Ordering::Relaxed)
    }

    /// Items lost to a full queue or a subscriber that did not read in time.
    pub fn dropped(&self) -> u64 {
        self.0.dropped.load(Ordering::Relaxed)
    }

    fn record_delivered(&self) {
        self.0.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.0.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Sending half of a subscription.
#[derive(Debug)]
pub struct EventSink {
    queue: mpsc::Sender<StreamItem>,
    subscriber: mpsc::Sender<StreamItem>,
    stats: DeliveryStats,
}

impl EventSink {
    /// Create a sink, the stream it feeds, and spawn the forwarding task
    /// between them on the current tokio runtime.
    ///
    /// Both the queue and the subscriber channel hold `capacity` items. An
    /// item waits at most `timeout` for the subscriber to make room.
    ///
    /// # Panics
    ///
    /// Panics outside a tokio runtime or if `capacity` is zero.
    /// [`BridgeConfig::validate`] rejects such configurations.
    ///
    /// [`BridgeConfig::validate`]: crate::config::BridgeConfig::validate
    pub fn channel(
        capacity: usize,
        timeout: Duration,
        stats: DeliveryStats,
    ) -> (Self, ScanStream) {
        let (queue, queued) = mpsc::channel(capacity);
        let (subscriber, rx) = mpsc::channel(capacity);
        tokio::spawn(forward(queued, subscriber.clone(), timeout, stats.clone()));

        let sink = Self {
            queue,
            subscriber,
            stats,
        };
        (sink, ScanStream { rx })
    }

    /// Queue `item` for the subscriber without waiting.
    pub fn deliver(&self, item: StreamItem) -> Delivery {
        if self.is_closed() {
            return Delivery::Closed;
        }
        match self.queue.try_send(item) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Whether the subscriber has dropped its stream.
    pub fn is_closed(&self) -> bool {
        self.subscriber.is_closed() || self.queue.is_closed()
    }

    /// Resolve once the subscriber has dropped its stream.
    pub async fn closed(&self) {
        self.subscriber.closed().await;
    }
}

/// Move queued items to the subscriber in order.
///
/// Ends when the sink is dropped and the queue is drained, or when the
/// subscriber drops its stream.
async fn forward(
    mut queued: mpsc::Receiver<StreamItem>,
    subscriber: mpsc::Sender<StreamItem>,
    timeout: Duration,
    stats: DeliveryStats,
) {
    loop {
        let item = tokio::select! {
            item = queued.recv() => match item {
                Some(item) => item,
                None => break,
            },
            () = subscriber.closed() => break,
        };
        let is_event = item.is_ok();

        match subscriber.send_timeout(item, timeout).await {
            Ok(()) => {
                if is_event {
                    stats.record_delivered();
                }
            }
            Err(SendTimeoutError::Timeout(_)) => {
                stats.record_dropped();
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "Subscriber not keeping up, scan dropped"
                );
            }
            Err(SendTimeoutError::Closed(_)) => break,
        }
    }
    trace!("Event forwarder finished");
}

/// Receiving half of a subscription.
///
/// Ends (yields `None`) when the subscription is cancelled or replaced.
///
/// # Examples
///
/// ```
/// use futures::StreamExt;
/// use infrascan_bridge::sink::{Delivery, DeliveryStats, EventSink, ReceiverError};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let stats = DeliveryStats::default();
///     let (sink, mut stream) = EventSink::channel(4, Duration::from_millis(10), stats);
///     assert_eq!(sink.deliver(Err(ReceiverError::new("boom"))), Delivery::Queued);
///     drop(sink);
///
///     let item = stream.next().await.unwrap();
///     assert_eq!(item.unwrap_err().code, "RECEIVER_ERROR");
///     assert!(stream.next().await.is_none());
/// }
/// ```
#[derive(Debug)]
pub struct ScanStream {
    rx: mpsc::Receiver<StreamItem>,
}

impl ScanStream {
    /// Wait for the next item.
    pub async fn recv(&mut self) -> Option<StreamItem> {
        self.rx.recv().await
    }

    /// Take an item if one is already queued.
    pub fn try_recv(&mut self) -> Option<StreamItem> {
        self.rx.try_recv().ok()
    }
}

impl Stream for ScanStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    const TIMEOUT: Duration = Duration::from_millis(50);

    fn event(code: &str) -> ScanEvent {
        ScanEvent {
            code: code.to_string(),
            length: code.len(),
            symbology: "QR".to_string(),
            aim_id: "]Q1".to_string(),
            raw: Bytes::copy_from_slice(code.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_deliver_in_order() {
        let stats = DeliveryStats::default();
        let (sink, mut stream) = EventSink::channel(8, TIMEOUT, stats.clone());
        for code in ["1", "2", "3"] {
            assert_eq!(sink.deliver(Ok(event(code))), Delivery::Queued);
        }

        for code in ["1", "2", "3"] {
            assert_eq!(stream.recv().await.unwrap().unwrap().code, code);
        }
        assert_eq!(stats.delivered(), 3);
    }

    #[tokio::test]
    async fn test_full_queue_drops_without_waiting() {
        let stats = DeliveryStats::default();
        let (sink, mut stream) = EventSink::channel(1, TIMEOUT, stats.clone());

        // The forwarder has not run yet, so the second item finds the queue full.
        assert_eq!(sink.deliver(Ok(event("first"))), Delivery::Queued);
        assert_eq!(sink.deliver(Ok(event("second"))), Delivery::Dropped);
        assert_eq!(stats.dropped(), 1);

        assert_eq!(stream.recv().await.unwrap().unwrap().code, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_subscriber_drops_after_timeout() {
        let stats = DeliveryStats::default();
        let (sink, mut stream) = EventSink::channel(1, TIMEOUT, stats.clone());

        assert_eq!(sink.deliver(Ok(event("first"))), Delivery::Queued);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.deliver(Ok(event("second"))), Delivery::Queued);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(sink.deliver(Ok(event("third"))), Delivery::Queued);

        tokio::time::sleep(TIMEOUT * 4).await;
        assert_eq!(stats.delivered(), 1);
        assert_eq!(stats.dropped(), 2);

        assert_eq!(stream.recv().await.unwrap().unwrap().code, "first");
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_error_items_are_not_counted_as_delivered() {
        let stats = DeliveryStats::default();
        let (sink, mut stream) = EventSink::channel(4, TIMEOUT, stats.clone());

        sink.deliver(Err(ReceiverError::new("bad extra")));
        assert!(stream.recv().await.unwrap().is_err());
        assert_eq!(stats.delivered(), 0);
    }

    #[tokio::test]
    async fn test_dropped_stream_reports_closed() {
        let (sink, stream) = EventSink::channel(1, TIMEOUT, DeliveryStats::default());
        drop(stream);

        assert!(sink.is_closed());
        sink.closed().await;
        assert_eq!(sink.deliver(Ok(event("x"))), Delivery::Closed);
    }

    #[tokio::test]
    async fn test_dropping_sink_ends_stream_after_queued_items() {
        let (sink, mut stream) = EventSink::channel(4, TIMEOUT, DeliveryStats::default());
        sink.deliver(Ok(event("last")));
        drop(sink);

        assert_eq!(stream.recv().await.unwrap().unwrap().code, "last");
        assert!(stream.recv().await.is_none());
    }

    #[test]
    fn test_receiver_error_display() {
        let error = ReceiverError::new("extra `length` has type text, expected int");
        assert_eq!(
            error.to_string(),
            "RECEIVER_ERROR: extra `length` has type text, expected int"
        );
    }
}
