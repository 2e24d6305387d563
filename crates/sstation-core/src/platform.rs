// ── Platform setup ──
//
// Turns registry entries into entities and hands them to the host runtime.
// Cameras are listed once here and filtered by the host's whitelist; polls
// never re-list.

use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{info, warn};

use crate::entity::{CameraEntity, Entity, ModeSensor, ModeSwitch};
use crate::registry::HostRegistry;

/// Receives entities created by the setup functions.
pub trait AddEntities {
    fn add_entities(&mut self, entities: Vec<Entity>);
}

impl AddEntities for Vec<Entity> {
    fn add_entities(&mut self, entities: Vec<Entity>) {
        self.extend(entities);
    }
}

/// Create one camera entity per whitelisted camera on every host.
///
/// A host whose camera listing fails or comes back empty is skipped with a
/// warning; other hosts are unaffected. Returns the number of cameras added.
pub async fn setup_cameras(registry: &HostRegistry, sink: &mut dyn AddEntities) -> usize {
    let listings = join_all(registry.iter().map(|entry| entry.client().list_cameras())).await;

    let mut entities = Vec::new();
    for (entry, listing) in registry.iter().zip(listings) {
        let cameras = match listing {
            Ok(cameras) if !cameras.is_empty() => cameras,
            Ok(_) => {
                warn!(host = %entry.name(), "no cameras reported, skipping camera setup for this host");
                continue;
            }
            Err(e) => {
                warn!(host = %entry.name(), error = %e, "could not fetch cameras, skipping camera setup for this host");
                continue;
            }
        };

        for camera in cameras
            .iter()
            .filter(|c| entry.whitelist().allows(c.display_name()))
        {
            info!(host = %entry.name(), camera_id = camera.id, name = %camera.display_name(), "initializing camera");
            entities.push(Entity::Camera(Arc::new(CameraEntity::new(
                entry.name(),
                camera,
                Arc::clone(entry.client()),
                Arc::clone(entry.proxy()),
            ))));
        }
    }

    let added = entities.len();
    sink.add_entities(entities);
    added
}

/// Create one home mode sensor per host.
pub fn setup_sensors(registry: &HostRegistry, sink: &mut dyn AddEntities) -> usize {
    let entities: Vec<Entity> = registry
        .iter()
        .map(|entry| Entity::Sensor(Arc::new(ModeSensor::new(entry.name(), Arc::clone(entry.client())))))
        .collect();
    let added = entities.len();
    sink.add_entities(entities);
    added
}

/// Create one home mode switch per host, sharing the host's home-mode lock.
pub fn setup_switches(registry: &HostRegistry, sink: &mut dyn AddEntities) -> usize {
    let entities: Vec<Entity> = registry
        .iter()
        .map(|entry| {
            Entity::Switch(Arc::new(ModeSwitch::new(
                entry.name(),
                Arc::clone(entry.client()),
                Arc::clone(entry.home_mode_lock()),
            )))
        })
        .collect();
    let added = entities.len();
    sink.add_entities(entities);
    added
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::Ordering;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Whitelist;
    use crate::entity::EntityKind;
    use crate::registry::HostEntry;
    use crate::remote::RemoteClient;
    use crate::testing::{FakeClient, camera};

    fn names(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(Entity::name).collect()
    }

    #[tokio::test]
    async fn whitelist_selects_intersection() {
        let fake = Arc::new(FakeClient::with_cameras(vec![
            camera(1, "Front Door"),
            camera(2, "Back Yard"),
        ]));
        let registry = HostRegistry::from_entries([HostEntry::for_test(
            "Cam1",
            Arc::clone(&fake) as Arc<dyn RemoteClient>,
        )
        .with_whitelist(Whitelist::new(["Front Door", "Garage"]))]);

        let mut entities = Vec::new();
        let added = setup_cameras(&registry, &mut entities).await;

        assert_eq!(added, 1);
        assert_eq!(names(&entities), vec!["Front Door".to_string()]);
        assert_eq!(entities[0].unique_id(), "Cam1:camera:1");
    }

    #[tokio::test]
    async fn empty_whitelist_includes_every_camera() {
        let fake = Arc::new(FakeClient::with_cameras(vec![
            camera(1, "Front Door"),
            camera(2, "Back Yard"),
        ]));
        let registry = HostRegistry::from_entries([HostEntry::for_test(
            "nas",
            Arc::clone(&fake) as Arc<dyn RemoteClient>,
        )]);

        let mut entities = Vec::new();
        setup_cameras(&registry, &mut entities).await;

        assert_eq!(
            names(&entities),
            vec!["Front Door".to_string(), "Back Yard".to_string()]
        );
    }

    #[tokio::test]
    async fn host_without_cameras_is_skipped_alone() {
        let empty = Arc::new(FakeClient::default());
        let broken = Arc::new(FakeClient::with_cameras(vec![camera(9, "Porch")]));
        broken.fail_reads.store(true, Ordering::SeqCst);
        let full = Arc::new(FakeClient::with_cameras(vec![camera(1, "Front Door")]));
        let registry = HostRegistry::from_entries([
            HostEntry::for_test("empty", Arc::clone(&empty) as Arc<dyn RemoteClient>),
            HostEntry::for_test("broken", Arc::clone(&broken) as Arc<dyn RemoteClient>),
            HostEntry::for_test("full", Arc::clone(&full) as Arc<dyn RemoteClient>),
        ]);

        let mut entities = Vec::new();
        let cameras = setup_cameras(&registry, &mut entities).await;
        let sensors = setup_sensors(&registry, &mut entities);
        let switches = setup_switches(&registry, &mut entities);

        assert_eq!((cameras, sensors, switches), (1, 3, 3));
        assert_eq!(entities[0].host(), "full");
        assert_eq!(
            entities.iter().filter(|e| e.kind() == EntityKind::Switch).count(),
            3
        );
    }

    #[tokio::test]
    async fn entities_share_the_host_client() {
        let fake = Arc::new(FakeClient::with_cameras(vec![camera(1, "Front Door")]));
        let registry = HostRegistry::from_entries([HostEntry::for_test(
            "nas",
            Arc::clone(&fake) as Arc<dyn RemoteClient>,
        )]);

        let mut entities = Vec::new();
        setup_cameras(&registry, &mut entities).await;
        setup_sensors(&registry, &mut entities);
        for entity in &entities {
            entity.refresh().await;
        }

        assert_eq!(fake.call_count("list_cameras"), 1);
        assert_eq!(fake.call_count("get_camera"), 1);
        assert_eq!(fake.call_count("get_home_mode"), 1);
        assert!(entities.iter().all(Entity::available));
    }
}
