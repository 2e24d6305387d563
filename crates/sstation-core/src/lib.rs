//! Integration layer between `sstation-api` and a host automation runtime.
//!
//! - **[`HostRegistry`]**: One entry per configured appliance, built once at
//!   startup by [`HostRegistry::build`]. Hosts that fail to connect are left
//!   out and reported in a [`SetupReport`]; the rest keep working.
//!
//! - **Entities** ([`entity`]): [`CameraEntity`], [`ModeSensor`] and
//!   [`ModeSwitch`], each holding the host's shared [`RemoteClient`] and a
//!   `watch` channel with its latest [`EntityState`]. A refresh replaces the
//!   snapshot whole or marks it stale; readers never see a partial update.
//!
//! - **[`StreamProxy`]**: Relays a camera's MJPEG stream frame by frame into
//!   any `Sink<Bytes>`, one frame in flight at a time.
//!
//! - **[`HomeModeController`]**: Serialized, confirmed home/away changes
//!   addressed by host name.
//!
//! - **[`PollScheduler`]**: One polling task per entity, cancelled together.

pub mod config;
pub mod control;
pub mod entity;
pub mod error;
pub mod platform;
pub mod proxy;
pub mod registry;
pub mod remote;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{HostConfig, Whitelist};
pub use control::{CommandError, HomeMode, HomeModeController, SetHomeModeCall};
pub use entity::{
    CameraEntity, CameraSnapshot, Entity, EntityKind, EntityState, EntityView, HomeModeSnapshot,
    ModeSensor, ModeSwitch, Refreshable, Streamable, Toggleable,
};
pub use error::CoreError;
pub use platform::{AddEntities, setup_cameras, setup_sensors, setup_switches};
pub use proxy::{RelayOutcome, StreamError, StreamProxy, relay};
pub use registry::{Connector, HostEntry, HostFailure, HostRegistry, SetupReport, SurveillanceConnector};
pub use remote::RemoteClient;
pub use scheduler::PollScheduler;
