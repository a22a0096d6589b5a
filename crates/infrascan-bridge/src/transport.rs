//! Broadcast transport abstraction.
//!
//! The platform delivers scan broadcasts to registered receivers with
//! best-effort guarantees. [`BroadcastTransport`] is the narrow part of that
//! mechanism the bridge needs: registering one receiver for a filter and
//! unregistering it again. [`LocalBroadcastBus`] implements it in-process for
//! tests and the simulator.

use crate::intent::{Intent, IntentFilter};
use infrascan_core::constants::EXPORT_DECLARATION_MIN_SDK;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Receives broadcasts matching its registration.
///
/// Called from whatever thread the transport delivers on; implementations
/// should hand the intent off rather than process it in place.
pub trait BroadcastReceiver: Send + Sync {
    fn on_receive(&self, intent: Intent);
}

/// How a receiver registration declares its visibility to other apps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationForm {
    /// Explicitly not exported (required from SDK 33).
    NotExported,

    /// Pre-33 registration without a visibility declaration.
    Legacy,
}

impl RegistrationForm {
    /// Registration form required by a platform SDK level.
    ///
    /// ```
    /// use infrascan_bridge::transport::RegistrationForm;
    ///
    /// assert_eq!(RegistrationForm::for_sdk(34), RegistrationForm::NotExported);
    /// assert_eq!(RegistrationForm::for_sdk(30), RegistrationForm::Legacy);
    /// ```
    pub fn for_sdk(sdk_int: u32) -> Self {
        if sdk_int >= EXPORT_DECLARATION_MIN_SDK {
            Self::NotExported
        } else {
            Self::Legacy
        }
    }
}

/// Token identifying one live registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiverId(u64);

impl fmt::Display for ReceiverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receiver#{}", self.0)
    }
}

/// Errors reported by a broadcast transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The id is unknown or was already unregistered.
    #[error("{0} is not registered")]
    NotRegistered(ReceiverId),

    /// The platform refused the registration.
    #[error("registration rejected: {0}")]
    Rejected(String),
}

/// Platform broadcast mechanism.
pub trait BroadcastTransport: Send + Sync {
    /// Platform SDK level, used to pick the [`RegistrationForm`].
    fn sdk_int(&self) -> u32;

    /// Register `receiver` for broadcasts matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform refuses the registration.
    fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: IntentFilter,
        form: RegistrationForm,
    ) -> Result<ReceiverId, TransportError>;

    /// Remove a registration.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::NotRegistered`] if `id` is not live.
    fn unregister_receiver(&self, id: ReceiverId) -> Result<(), TransportError>;
}

struct Registration {
    receiver: Arc<dyn BroadcastReceiver>,
    filter: IntentFilter,
    form: RegistrationForm,
}

/// In-process broadcast transport.
///
/// # Examples
///
/// ```
/// use infrascan_bridge::intent::{Intent, IntentFilter};
/// use infrascan_bridge::transport::{
///     BroadcastReceiver, BroadcastTransport, LocalBroadcastBus, RegistrationForm,
/// };
/// use std::sync::{Arc, Mutex};
///
/// struct Collect(Mutex<Vec<Intent>>);
///
/// impl BroadcastReceiver for Collect {
///     fn on_receive(&self, intent: Intent) {
///         self.0.lock().unwrap().push(intent);
///     }
/// }
///
/// let bus = LocalBroadcastBus::new();
/// let receiver = Arc::new(Collect(Mutex::new(Vec::new())));
/// let id = bus
///     .register_receiver(receiver.clone(), IntentFilter::new("ping"), RegistrationForm::NotExported)
///     .unwrap();
///
/// assert_eq!(bus.send_broadcast(Intent::new("ping")), 1);
/// assert_eq!(bus.send_broadcast(Intent::new("pong")), 0);
/// bus.unregister_receiver(id).unwrap();
/// assert!(bus.unregister_receiver(id).is_err());
/// ```
pub struct LocalBroadcastBus {
    sdk_int: u32,
    next_id: AtomicU64,
    registrations: Mutex<HashMap<ReceiverId, Registration>>,
    total_registrations: AtomicUsize,
    reject_registrations: AtomicBool,
}

impl LocalBroadcastBus {
    /// SDK level reported by [`LocalBroadcastBus::new`].
    pub const DEFAULT_SDK_INT: u32 = 34;

    /// Create a bus reporting a current SDK level.
    pub fn new() -> Self {
        Self::with_sdk_int(Self::DEFAULT_SDK_INT)
    }

    /// Create a bus reporting `sdk_int`.
    pub fn with_sdk_int(sdk_int: u32) -> Self {
        Self {
            sdk_int,
            next_id: AtomicU64::new(1),
            registrations: Mutex::new(HashMap::new()),
            total_registrations: AtomicUsize::new(0),
            reject_registrations: AtomicBool::new(false),
        }
    }

    fn registrations(&self) -> MutexGuard<'_, HashMap<ReceiverId, Registration>> {
        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver `intent` to every matching receiver.
    ///
    /// Returns the number of receivers reached.
    pub fn send_broadcast(&self, intent: Intent) -> usize {
        let targets: Vec<Arc<dyn BroadcastReceiver>> = self
            .registrations()
            .values()
            .filter(|registration| registration.filter.matches(&intent))
            .map(|registration| Arc::clone(&registration.receiver))
            .collect();

        trace!(action = %intent.action, receivers = targets.len(), "Broadcasting");
        for receiver in &targets {
            receiver.on_receive(intent.clone());
        }
        targets.len()
    }

    /// Number of live registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations().len()
    }

    /// Number of successful registrations since creation.
    pub fn total_registrations(&self) -> usize {
        self.total_registrations.load(Ordering::Relaxed)
    }

    /// Forms used by the live registrations.
    pub fn registered_forms(&self) -> Vec<RegistrationForm> {
        self.registrations()
            .values()
            .map(|registration| registration.form)
            .collect()
    }

    /// Make subsequent registrations fail.
    pub fn set_reject_registrations(&self, reject: bool) {
        self.reject_registrations.store(reject, Ordering::Relaxed);
    }
}

impl Default for LocalBroadcastBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalBroadcastBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBroadcastBus")
            .field("sdk_int", &self.sdk_int)
            .field("registrations", &self.registration_count())
            .finish()
    }
}

impl BroadcastTransport for LocalBroadcastBus {
    fn sdk_int(&self) -> u32 {
        self.sdk_int
    }

    fn register_receiver(
        &self,
        receiver: Arc<dyn BroadcastReceiver>,
        filter: IntentFilter,
        form: RegistrationForm,
    ) -> Result<ReceiverId, TransportError> {
        if self.reject_registrations.load(Ordering::Relaxed) {
            return Err(TransportError::Rejected(
                "registrations disabled on this bus".to_string(),
            ));
        }

        let id = ReceiverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(%id, ?form, actions = ?filter.actions(), "Receiver registered");
        self.registrations().insert(
            id,
            Registration {
                receiver,
                filter,
                form,
            },
        );
        self.total_registrations.fetch_add(1, Ordering::Relaxed);
        Ok(id)
    }

    fn unregister_receiver(&self, id: ReceiverId) -> Result<(), TransportError> {
        match self.registrations().remove(&id) {
            Some(_) => {
                debug!(%id, "Receiver unregistered");
                Ok(())
            }
            None => Err(TransportError::NotRegistered(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl BroadcastReceiver for Counter {
        fn on_receive(&self, _intent: Intent) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn test_register_and_deliver() {
        let bus = LocalBroadcastBus::new();
        let counter = Arc::new(Counter::default());

        bus.register_receiver(
            counter.clone(),
            IntentFilter::new("scan.rcv.message"),
            RegistrationForm::NotExported,
        )
        .unwrap();

        assert_eq!(bus.send_broadcast(Intent::new("scan.rcv.message")), 1);
        assert_eq!(bus.send_broadcast(Intent::new("unrelated")), 0);
        assert_eq!(counter.0.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_double_unregister_reports_not_registered() {
        let bus = LocalBroadcastBus::new();
        let id = bus
            .register_receiver(
                Arc::new(Counter::default()),
                IntentFilter::new("a"),
                RegistrationForm::Legacy,
            )
            .unwrap();

        bus.unregister_receiver(id).unwrap();
        assert_eq!(
            bus.unregister_receiver(id),
            Err(TransportError::NotRegistered(id))
        );
        assert_eq!(bus.registration_count(), 0);
        assert_eq!(bus.total_registrations(), 1);
    }

    #[test]
    fn test_rejected_registration() {
        let bus = LocalBroadcastBus::new();
        bus.set_reject_registrations(true);

        let result = bus.register_receiver(
            Arc::new(Counter::default()),
            IntentFilter::new("a"),
            RegistrationForm::Legacy,
        );
        assert!(matches!(result, Err(TransportError::Rejected(_))));
        assert_eq!(bus.registration_count(), 0);
    }

    #[test]
    fn test_registration_form_threshold() {
        assert_eq!(RegistrationForm::for_sdk(32), RegistrationForm::Legacy);
        assert_eq!(RegistrationForm::for_sdk(33), RegistrationForm::NotExported);
    }

    #[test]
    fn test_receiver_id_display() {
        let bus = LocalBroadcastBus::with_sdk_int(30);
        let id = bus
            .register_receiver(
                Arc::new(Counter::default()),
                IntentFilter::new("a"),
                RegistrationForm::for_sdk(bus.sdk_int()),
            )
            .unwrap();
        assert_eq!(id.to_string(), "receiver#1");
        assert_eq!(bus.registered_forms(), vec![RegistrationForm::Legacy]);
    }
}
