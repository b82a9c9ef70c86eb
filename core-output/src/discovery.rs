//! Discovery notification forwarding.
//!
//! Platform plugins push device-discovered and session-lifecycle
//! notifications on their own channels; this forwards them onto the engine
//! event bus so the UI's device picker can react without holding a receiver
//! per plugin.

use bridge_traits::renderer::{DeviceDiscovery, SessionNotification};
use core_runtime::events::{EventBus, OutputEvent, PlayerEvent, RecvError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Republish a discovery plugin's notifications as [`OutputEvent`]s.
///
/// Returns the forwarding task; abort it to stop forwarding. Session
/// started/ended notifications are adapter concerns and are not forwarded
/// here.
pub fn forward_discovery(discovery: Arc<dyn DeviceDiscovery>, bus: EventBus) -> JoinHandle<()> {
    let mut notifications = discovery.notifications();
    tokio::spawn(async move {
        loop {
            match notifications.recv().await {
                Ok(SessionNotification::DeviceDiscovered(device)) => {
                    debug!(device = %device.id, name = %device.name, "device discovered");
                    bus.emit(PlayerEvent::Output(OutputEvent::DeviceDiscovered {
                        device_id: device.id,
                        name: device.name,
                    }))
                    .ok();
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result;
    use bridge_traits::renderer::{CapabilityClass, DeviceDescriptor};
    use tokio::sync::broadcast;

    struct StaticDiscovery {
        devices: Vec<DeviceDescriptor>,
        notifications: broadcast::Sender<SessionNotification>,
    }

    #[async_trait]
    impl DeviceDiscovery for StaticDiscovery {
        async fn available_devices(&self) -> Result<Vec<DeviceDescriptor>> {
            Ok(self.devices.clone())
        }

        fn notifications(&self) -> broadcast::Receiver<SessionNotification> {
            self.notifications.subscribe()
        }
    }

    #[tokio::test]
    async fn discovered_devices_reach_the_event_bus() {
        let (tx, _) = broadcast::channel(8);
        let discovery = Arc::new(StaticDiscovery {
            devices: Vec::new(),
            notifications: tx.clone(),
        });
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        let _task = forward_discovery(discovery, bus);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        tx.send(SessionNotification::DeviceDiscovered(DeviceDescriptor {
            id: "dev-9".into(),
            name: "Kitchen".into(),
            class: CapabilityClass::Upnp,
        }))
        .unwrap();

        let event = tokio::time::timeout(std::time::Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            PlayerEvent::Output(OutputEvent::DeviceDiscovered {
                device_id: "dev-9".into(),
                name: "Kitchen".into(),
            })
        );
    }

    #[tokio::test]
    async fn session_notifications_are_not_forwarded() {
        let (tx, _) = broadcast::channel(8);
        let discovery = Arc::new(StaticDiscovery {
            devices: Vec::new(),
            notifications: tx.clone(),
        });
        let bus = EventBus::new(8);
        let mut events = bus.subscribe();

        let _task = forward_discovery(discovery, bus);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        tx.send(SessionNotification::SessionEnded {
            device_id: "dev-9".into(),
        })
        .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(30)).await;
        assert!(events.try_recv().is_err());
    }
}
