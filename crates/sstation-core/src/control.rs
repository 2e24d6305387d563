// ── Home mode control actions ──
//
// Changes to a host's home mode are serialized per host and confirmed by
// reading the mode back. The `set_home_mode` service and the home mode
// switch both go through `apply_home_mode`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sstation_api::Error as ApiError;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::registry::HostRegistry;
use crate::remote::RemoteClient;

/// Appliance-wide presence mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HomeMode {
    Home,
    Away,
}

impl HomeMode {
    pub fn is_home(self) -> bool {
        self == Self::Home
    }

    pub fn from_on(on: bool) -> Self {
        if on { Self::Home } else { Self::Away }
    }
}

/// Payload of the `set_home_mode` service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetHomeModeCall {
    /// Host name the change is addressed to.
    #[serde(alias = "host_id")]
    pub id: String,
    #[serde(alias = "mode")]
    pub home_mode: HomeMode,
}

/// Why a control action did not take effect.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown Surveillance Station host: {host}")]
    UnknownHost { host: String },

    #[error("{host} did not confirm home mode {requested} (reports {applied})")]
    NotConfirmed {
        host: String,
        requested: HomeMode,
        applied: HomeMode,
    },

    #[error("Home mode change on {host} failed: {source}")]
    Remote {
        host: String,
        #[source]
        source: ApiError,
    },
}

/// Switch a host's home mode under its lock and check the result.
pub(crate) async fn apply_home_mode(
    host: &str,
    client: &dyn RemoteClient,
    lock: &Mutex<()>,
    mode: HomeMode,
) -> Result<HomeMode, CommandError> {
    let _guard = lock.lock().await;

    let applied = client
        .set_home_mode(mode.is_home())
        .await
        .map(HomeMode::from_on)
        .map_err(|source| {
            error!(host, requested = %mode, error = %source, "home mode change failed");
            CommandError::Remote {
                host: host.to_owned(),
                source,
            }
        })?;

    if applied != mode {
        error!(host, requested = %mode, %applied, "home mode change not confirmed");
        return Err(CommandError::NotConfirmed {
            host: host.to_owned(),
            requested: mode,
            applied,
        });
    }

    info!(host, mode = %applied, "home mode changed");
    Ok(applied)
}

/// Entry point for home mode changes addressed by host name.
#[derive(Clone)]
pub struct HomeModeController {
    registry: Arc<HostRegistry>,
}

impl HomeModeController {
    pub fn new(registry: Arc<HostRegistry>) -> Self {
        Self { registry }
    }

    /// Set `host_id`'s home mode and wait for the appliance to confirm it.
    ///
    /// Unknown hosts fail without contacting any appliance. Nothing is
    /// retried.
    pub async fn set_home_mode(&self, host_id: &str, mode: HomeMode) -> Result<(), CommandError> {
        let entry = self
            .registry
            .get(host_id)
            .ok_or_else(|| CommandError::UnknownHost {
                host: host_id.to_owned(),
            })?;

        apply_home_mode(
            entry.name(),
            entry.client().as_ref(),
            entry.home_mode_lock(),
            mode,
        )
        .await
        .map(|_| ())
    }

    /// Handle a `set_home_mode` service call.
    pub async fn handle(&self, call: &SetHomeModeCall) -> Result<(), CommandError> {
        self.set_home_mode(&call.id, call.home_mode).await
    }
}
