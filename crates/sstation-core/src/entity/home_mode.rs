// ── Home mode sensor and switch ──
//
// Both mirror the appliance-wide home mode flag. The switch can also change
// it, through the host's home-mode lock shared with `HomeModeController`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::warn;

use super::state::{EntityState, StateCell};
use super::{EntityKind, EntityView, Refreshable, Toggleable, on_off};
use crate::control::{CommandError, HomeMode, apply_home_mode};
use crate::remote::RemoteClient;

const SENSOR_NAME: &str = "Home Mode";
const SWITCH_NAME: &str = "Surveillance Station Home Mode";
const ICON_HOME: &str = "mdi:home-account";
const ICON_AWAY: &str = "mdi:home-outline";

/// What one poll of the home mode flag observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HomeModeSnapshot {
    pub is_home: bool,
}

impl HomeModeSnapshot {
    pub fn mode(self) -> HomeMode {
        HomeMode::from_on(self.is_home)
    }
}

async fn poll_home_mode(
    client: &dyn RemoteClient,
    state: &StateCell<HomeModeSnapshot>,
    entity: &str,
) {
    match client.get_home_mode().await {
        Ok(is_home) => state.publish(HomeModeSnapshot { is_home }),
        Err(e) => {
            warn!(entity, error = %e, "home mode poll failed, keeping last state");
            state.mark_unavailable();
        }
    }
}

// ── Sensor ───────────────────────────────────────────────────────────

/// Read-only view of a host's home mode: `on` when home.
pub struct ModeSensor {
    host: String,
    client: Arc<dyn RemoteClient>,
    state: StateCell<HomeModeSnapshot>,
}

impl ModeSensor {
    pub fn new(host: impl Into<String>, client: Arc<dyn RemoteClient>) -> Self {
        Self {
            host: host.into(),
            client,
            state: StateCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn name(&self) -> &'static str {
        SENSOR_NAME
    }

    pub fn unique_id(&self) -> String {
        format!("{}:home_mode_sensor", self.host)
    }

    pub fn state(&self) -> EntityState<HomeModeSnapshot> {
        self.state.current()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<EntityState<HomeModeSnapshot>> {
        self.state.subscribe()
    }

    pub fn view(&self) -> EntityView {
        let current = self.state.current();
        EntityView {
            unique_id: self.unique_id(),
            host: self.host.clone(),
            kind: EntityKind::Sensor,
            name: SENSOR_NAME.into(),
            state: current.snapshot.map(|s| on_off(s.is_home).to_owned()),
            available: current.available,
            icon: None,
            last_updated: current.last_updated,
            attributes: serde_json::Value::Null,
        }
    }
}

impl Refreshable for ModeSensor {
    async fn refresh(&self) {
        poll_home_mode(self.client.as_ref(), &self.state, &self.unique_id()).await;
    }

    fn available(&self) -> bool {
        self.state.available()
    }
}

// ── Switch ───────────────────────────────────────────────────────────

/// Toggle for a host's home mode.
///
/// Turning it on or off does not touch the local state; the change shows up
/// on the next poll, as read back from the appliance.
pub struct ModeSwitch {
    host: String,
    client: Arc<dyn RemoteClient>,
    lock: Arc<Mutex<()>>,
    state: StateCell<HomeModeSnapshot>,
}

impl ModeSwitch {
    /// `lock` must be the host's home-mode lock so switch and service calls
    /// never interleave.
    pub fn new(host: impl Into<String>, client: Arc<dyn RemoteClient>, lock: Arc<Mutex<()>>) -> Self {
        Self {
            host: host.into(),
            client,
            lock,
            state: StateCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn name(&self) -> &'static str {
        SWITCH_NAME
    }

    pub fn unique_id(&self) -> String {
        format!("{}:home_mode_switch", self.host)
    }

    pub fn state(&self) -> EntityState<HomeModeSnapshot> {
        self.state.current()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<EntityState<HomeModeSnapshot>> {
        self.state.subscribe()
    }

    /// `mdi:home-account` when on, `mdi:home-outline` when off, none before
    /// the first poll.
    pub fn icon(&self) -> Option<&'static str> {
        self.is_on()
            .map(|on| if on { ICON_HOME } else { ICON_AWAY })
    }

    pub fn view(&self) -> EntityView {
        let current = self.state.current();
        EntityView {
            unique_id: self.unique_id(),
            host: self.host.clone(),
            kind: EntityKind::Switch,
            name: SWITCH_NAME.into(),
            state: current.snapshot.map(|s| on_off(s.is_home).to_owned()),
            available: current.available,
            icon: self.icon(),
            last_updated: current.last_updated,
            attributes: serde_json::Value::Null,
        }
    }

    async fn switch(&self, mode: HomeMode) -> Result<(), CommandError> {
        apply_home_mode(&self.host, self.client.as_ref(), &self.lock, mode)
            .await
            .map(|_| ())
    }
}

impl Refreshable for ModeSwitch {
    async fn refresh(&self) {
        poll_home_mode(self.client.as_ref(), &self.state, &self.unique_id()).await;
    }

    fn available(&self) -> bool {
        self.state.available()
    }
}

impl Toggleable for ModeSwitch {
    async fn turn_on(&self) -> Result<(), CommandError> {
        self.switch(HomeMode::Home).await
    }

    async fn turn_off(&self) -> Result<(), CommandError> {
        self.switch(HomeMode::Away).await
    }

    fn is_on(&self) -> Option<bool> {
        self.state.current().snapshot.map(|s| s.is_home)
    }
}
