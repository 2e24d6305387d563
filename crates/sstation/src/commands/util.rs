//! Shared helpers for command handlers: config loading, host connection,
//! camera lookup.

use std::sync::Arc;

use clap::ValueEnum;
use tracing::warn;

use sstation_config::Config;
use sstation_core::{CameraEntity, Entity, HostConfig, HostRegistry, SurveillanceConnector, setup_cameras};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

/// Loaded configuration plus the hosts that connected.
pub struct Connected {
    pub config: Config,
    pub registry: Arc<HostRegistry>,
}

/// Valid host configs, narrowed to `--host` when given.
///
/// Invalid entries are logged and skipped; if nothing valid remains the
/// first error is returned.
pub fn host_configs(config: &Config, global: &GlobalOpts) -> Result<Vec<HostConfig>, CliError> {
    if config.hosts.is_empty() {
        return Err(CliError::NoConfig {
            path: global
                .config
                .clone()
                .unwrap_or_else(sstation_config::config_path)
                .display()
                .to_string(),
        });
    }

    if let Some(ref name) = global.host {
        if !config.hosts.iter().any(|h| &h.name == name) {
            return Err(CliError::HostNotFound {
                name: name.clone(),
                available: config
                    .hosts
                    .iter()
                    .map(|h| h.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }

    let mut valid = Vec::new();
    let mut first_error = None;
    for (section, result) in config.hosts.iter().zip(config.host_configs()) {
        if global.host.as_ref().is_some_and(|name| name != &section.name) {
            continue;
        }
        match result {
            Ok(host) => valid.push(host),
            Err(e) => {
                warn!(host = %section.name, error = %e, "skipping misconfigured host");
                first_error.get_or_insert(e);
            }
        }
    }

    match (valid.is_empty(), first_error) {
        (true, Some(e)) => Err(e.into()),
        _ => Ok(valid),
    }
}

/// Load the config and connect every selected host.
///
/// Hosts that fail are logged and left out. Fails only when no host at all
/// could be reached.
pub async fn connect(global: &GlobalOpts) -> Result<Connected, CliError> {
    let config = sstation_config::load_config(global.config.as_deref())?;
    let hosts = host_configs(&config, global)?;

    let (registry, mut report) = HostRegistry::build(hosts, &SurveillanceConnector).await;

    if registry.is_empty() {
        return Err(match report.failed.len() {
            1 => report.failed.remove(0).error.into(),
            _ => CliError::NoHosts,
        });
    }

    Ok(Connected {
        config,
        registry: Arc::new(registry),
    })
}

/// `--output` when given, otherwise the config's `[defaults] output`.
pub fn output_format(config: &Config, global: &GlobalOpts) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&config.defaults.output, true).map_err(|reason| CliError::Validation {
        field: "defaults.output".into(),
        reason,
    })
}

/// Cameras of every connected host, after whitelist filtering.
pub async fn cameras(registry: &HostRegistry) -> Vec<Arc<CameraEntity>> {
    let mut entities = Vec::new();
    setup_cameras(registry, &mut entities).await;
    entities
        .iter()
        .filter_map(Entity::as_camera)
        .cloned()
        .collect()
}

/// Find a camera by numeric id or by name (case-insensitive).
pub fn find_camera<'a>(cameras: &'a [Arc<CameraEntity>], selector: &str) -> Option<&'a Arc<CameraEntity>> {
    match selector.parse::<u32>() {
        Ok(id) => cameras.iter().find(|c| c.camera_id() == id),
        Err(_) => cameras
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(selector)),
    }
}
