//! Host lifecycle handling.
//!
//! The host (an activity on a terminal, the simulator elsewhere) reports
//! attach and detach transitions as [`LifecycleEvent`] values. The coordinator
//! owns the [`DeviceHandle`] and re-acquires it when the host comes back.
//!
//! | Event | Host binding | Device handle |
//! |---|---|---|
//! | `Attached` | bound | created, replacing any previous one |
//! | `DetachedForConfigChanges` | unbound | kept |
//! | `ReattachedForConfigChanges` | bound | created only if absent |
//! | `Detached` | unbound | cleared |
//!
//! The event bridge registration is independent of all of these.

use infrascan_core::OutputMode;
use infrascan_hardware::{DeviceHandle, HandleSnapshot, ScanDeviceFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

/// Host lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Attached,
    DetachedForConfigChanges,
    ReattachedForConfigChanges,
    Detached,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attached => "attached",
            Self::DetachedForConfigChanges => "detached_for_config_changes",
            Self::ReattachedForConfigChanges => "reattached_for_config_changes",
            Self::Detached => "detached",
        };
        f.write_str(name)
    }
}

impl FromStr for LifecycleEvent {
    type Err = infrascan_core::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attached" | "attach" => Ok(Self::Attached),
            "detached_for_config_changes" | "config-change" => Ok(Self::DetachedForConfigChanges),
            "reattached_for_config_changes" | "reattach" => Ok(Self::ReattachedForConfigChanges),
            "detached" | "detach" => Ok(Self::Detached),
            other => Err(infrascan_core::Error::invalid_argument(
                "lifecycle event",
                format!("unknown event `{other}`"),
            )),
        }
    }
}

/// Owner of the device handle across host transitions.
pub struct LifecycleCoordinator {
    factory: Arc<dyn ScanDeviceFactory>,
    handle: Option<DeviceHandle>,
    attached: bool,
    force_broadcast_on_attach: bool,
}

impl LifecycleCoordinator {
    /// Create a detached coordinator without a handle.
    pub fn new(factory: Arc<dyn ScanDeviceFactory>, force_broadcast_on_attach: bool) -> Self {
        Self {
            factory,
            handle: None,
            attached: false,
            force_broadcast_on_attach,
        }
    }

    /// Apply a host transition.
    pub async fn handle_event(&mut self, event: LifecycleEvent) {
        info!(%event, "Lifecycle transition");
        match event {
            LifecycleEvent::Attached => {
                self.attached = true;
                self.acquire().await;
            }
            LifecycleEvent::DetachedForConfigChanges => {
                self.attached = false;
            }
            LifecycleEvent::ReattachedForConfigChanges => {
                self.attached = true;
                if self.handle.is_none() {
                    self.acquire().await;
                }
            }
            LifecycleEvent::Detached => {
                self.attached = false;
                self.handle = None;
            }
        }
    }

    async fn acquire(&mut self) {
        self.handle = DeviceHandle::create(self.factory.as_ref());

        if !self.force_broadcast_on_attach {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            let outcome = handle.set_output_mode(OutputMode::Broadcast).await;
            if let Some(error) = outcome.error() {
                debug!(%error, "Could not force broadcast output");
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn handle(&self) -> Option<&DeviceHandle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut DeviceHandle> {
        self.handle.as_mut()
    }

    /// Cached configuration of the current handle.
    pub fn snapshot(&self) -> Option<HandleSnapshot> {
        self.handle.as_ref().map(DeviceHandle::snapshot)
    }
}

impl fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("attached", &self.attached)
            .field("handle", &self.handle)
            .field("force_broadcast_on_attach", &self.force_broadcast_on_attach)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infrascan_hardware::{MockDeviceFactory, MockScannerHandle, ScanOperation};
    use rstest::rstest;

    fn coordinator() -> (LifecycleCoordinator, MockScannerHandle) {
        let (factory, engine) = MockDeviceFactory::new();
        (LifecycleCoordinator::new(Arc::new(factory), true), engine)
    }

    #[tokio::test]
    async fn test_attach_creates_handle_and_forces_broadcast() {
        let (mut coordinator, engine) = coordinator();
        assert!(coordinator.handle().is_none());

        coordinator.handle_event(LifecycleEvent::Attached).await;
        assert!(coordinator.is_attached());
        assert!(coordinator.handle().is_some());
        assert_eq!(engine.instances_created(), 1);
        assert_eq!(engine.calls(), vec![ScanOperation::SetOutScanMode]);
    }

    #[tokio::test]
    async fn test_attach_replaces_existing_handle() {
        let (mut coordinator, engine) = coordinator();

        coordinator.handle_event(LifecycleEvent::Attached).await;
        coordinator.handle_event(LifecycleEvent::Attached).await;
        assert_eq!(engine.instances_created(), 2);
    }

    #[tokio::test]
    async fn test_config_change_keeps_handle() {
        let (mut coordinator, engine) = coordinator();

        coordinator.handle_event(LifecycleEvent::Attached).await;
        coordinator
            .handle_event(LifecycleEvent::DetachedForConfigChanges)
            .await;
        assert!(!coordinator.is_attached());
        assert!(coordinator.handle().is_some());

        coordinator
            .handle_event(LifecycleEvent::ReattachedForConfigChanges)
            .await;
        assert!(coordinator.is_attached());
        assert_eq!(engine.instances_created(), 1);
    }

    #[tokio::test]
    async fn test_reattach_recreates_missing_handle() {
        let (factory, engine) = MockDeviceFactory::unavailable();
        let mut coordinator = LifecycleCoordinator::new(Arc::new(factory), true);

        coordinator.handle_event(LifecycleEvent::Attached).await;
        assert!(coordinator.handle().is_none());

        engine.set_service_installed(true);
        coordinator
            .handle_event(LifecycleEvent::ReattachedForConfigChanges)
            .await;
        assert!(coordinator.handle().is_some());
        assert_eq!(engine.instances_created(), 1);
    }

    #[tokio::test]
    async fn test_detach_clears_handle() {
        let (mut coordinator, _engine) = coordinator();

        coordinator.handle_event(LifecycleEvent::Attached).await;
        coordinator.handle_event(LifecycleEvent::Detached).await;
        assert!(!coordinator.is_attached());
        assert!(coordinator.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_forced_broadcast_failure_is_ignored() {
        let (mut coordinator, engine) = coordinator();
        engine.fail(ScanOperation::SetOutScanMode);

        coordinator.handle_event(LifecycleEvent::Attached).await;
        assert!(coordinator.handle().is_some());
    }

    #[tokio::test]
    async fn test_force_broadcast_can_be_disabled() {
        let (factory, engine) = MockDeviceFactory::new();
        let mut coordinator = LifecycleCoordinator::new(Arc::new(factory), false);

        coordinator.handle_event(LifecycleEvent::Attached).await;
        assert!(engine.calls().is_empty());
    }

    #[rstest]
    #[case("attach", LifecycleEvent::Attached)]
    #[case("config-change", LifecycleEvent::DetachedForConfigChanges)]
    #[case("reattach", LifecycleEvent::ReattachedForConfigChanges)]
    #[case("detached", LifecycleEvent::Detached)]
    fn test_parse_event(#[case] input: &str, #[case] expected: LifecycleEvent) {
        assert_eq!(input.parse::<LifecycleEvent>().unwrap(), expected);
    }

    #[test]
    fn test_parse_round_trips_display() {
        for event in [
            LifecycleEvent::Attached,
            LifecycleEvent::DetachedForConfigChanges,
            LifecycleEvent::ReattachedForConfigChanges,
            LifecycleEvent::Detached,
        ] {
            assert_eq!(event.to_string().parse::<LifecycleEvent>().unwrap(), event);
        }
    }
}
