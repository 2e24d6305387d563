// ── Polled entities ──
//
// Local mirrors of remote appliance state. Each entity owns a shared
// `RemoteClient` handle and a `watch` channel holding its latest state; a
// scheduler calls `refresh()` on an interval.

mod camera;
mod home_mode;
mod state;

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures_util::Sink;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::control::CommandError;
use crate::error::CoreError;
use crate::proxy::{RelayOutcome, StreamError};

pub use camera::{CameraEntity, CameraSnapshot};
pub use home_mode::{HomeModeSnapshot, ModeSensor, ModeSwitch};
pub use state::EntityState;

// ── Capabilities ─────────────────────────────────────────────────────

/// Something the scheduler can poll.
pub trait Refreshable {
    /// Poll the appliance and publish the result.
    ///
    /// Never fails: a failed poll keeps the previous snapshot and marks the
    /// entity unavailable.
    fn refresh(&self) -> impl Future<Output = ()> + Send;

    fn available(&self) -> bool;
}

/// Something that can serve camera images.
pub trait Streamable {
    /// One still JPEG.
    fn camera_image(&self) -> impl Future<Output = Result<Bytes, CoreError>> + Send;

    /// Relay the live MJPEG stream into `sink` until either side ends or
    /// `cancel` fires.
    fn stream_mjpeg<S>(
        &self,
        sink: S,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<RelayOutcome, StreamError>> + Send
    where
        S: Sink<Bytes> + Send + Unpin;

    /// `Content-Type` of the bytes written by [`stream_mjpeg`](Self::stream_mjpeg).
    fn stream_content_type(&self) -> String;
}

/// Something that can be switched on and off.
pub trait Toggleable {
    fn turn_on(&self) -> impl Future<Output = Result<(), CommandError>> + Send;

    fn turn_off(&self) -> impl Future<Output = Result<(), CommandError>> + Send;

    /// `None` until the first successful poll.
    fn is_on(&self) -> Option<bool>;
}

// ── Heterogeneous entity handle ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
    Camera,
    Sensor,
    Switch,
}

/// Any entity this integration registers. Cheap to clone.
#[derive(Clone)]
pub enum Entity {
    Camera(Arc<CameraEntity>),
    Sensor(Arc<ModeSensor>),
    Switch(Arc<ModeSwitch>),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Camera(_) => EntityKind::Camera,
            Self::Sensor(_) => EntityKind::Sensor,
            Self::Switch(_) => EntityKind::Switch,
        }
    }

    /// Stable identifier, unique across hosts.
    pub fn unique_id(&self) -> String {
        match self {
            Self::Camera(c) => c.unique_id(),
            Self::Sensor(s) => s.unique_id(),
            Self::Switch(s) => s.unique_id(),
        }
    }

    pub fn host(&self) -> &str {
        match self {
            Self::Camera(c) => c.host(),
            Self::Sensor(s) => s.host(),
            Self::Switch(s) => s.host(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Camera(c) => c.name(),
            Self::Sensor(s) => s.name().to_owned(),
            Self::Switch(s) => s.name().to_owned(),
        }
    }

    pub fn available(&self) -> bool {
        match self {
            Self::Camera(c) => c.available(),
            Self::Sensor(s) => s.available(),
            Self::Switch(s) => s.available(),
        }
    }

    pub async fn refresh(&self) {
        match self {
            Self::Camera(c) => c.refresh().await,
            Self::Sensor(s) => s.refresh().await,
            Self::Switch(s) => s.refresh().await,
        }
    }

    pub fn as_camera(&self) -> Option<&Arc<CameraEntity>> {
        match self {
            Self::Camera(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&Arc<ModeSwitch>> {
        match self {
            Self::Switch(s) => Some(s),
            _ => None,
        }
    }

    /// Serializable view of the current state.
    pub fn view(&self) -> EntityView {
        match self {
            Self::Camera(c) => c.view(),
            Self::Sensor(s) => s.view(),
            Self::Switch(s) => s.view(),
        }
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("kind", &self.kind())
            .field("unique_id", &self.unique_id())
            .finish()
    }
}

/// Flat, serializable rendering of one entity's state.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub unique_id: String,
    pub host: String,
    pub kind: EntityKind,
    pub name: String,
    /// `None` until the first successful poll.
    pub state: Option<String>,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'static str>,
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    pub attributes: serde_json::Value,
}

pub(crate) fn on_off(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}
