//! Home mode status and control.

use std::sync::Arc;

use futures_util::future::join_all;
use serde::Serialize;
use tabled::Tabled;

use sstation_core::{Entity, HomeModeController, HostRegistry, Refreshable, setup_sensors};

use crate::cli::{GlobalOpts, HomeModeArgs, HomeModeCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct HostMode {
    host: String,
    available: bool,
    home_mode: Option<String>,
}

#[derive(Tabled)]
struct HostModeRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Home Mode")]
    mode: String,
}

pub async fn handle(args: HomeModeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let connected = util::connect(global).await?;
    let registry = &connected.registry;

    let result = match args.command {
        HomeModeCommand::Status => match util::output_format(&connected.config, global) {
            Ok(format) => status(registry, format, global).await,
            Err(e) => Err(e),
        },
        HomeModeCommand::Set { mode } => {
            let controller = HomeModeController::new(Arc::clone(registry));
            let outcomes = join_all(registry.names().map(|host| controller.set_home_mode(host, mode))).await;

            let mut first_error = None;
            for (host, outcome) in registry.names().zip(outcomes) {
                match outcome {
                    Ok(()) if !global.quiet => eprintln!("{host}: home mode {mode}"),
                    Ok(()) => {}
                    Err(e) => {
                        eprintln!("{host}: {e}");
                        first_error.get_or_insert(e);
                    }
                }
            }
            first_error.map_or(Ok(()), |e| Err(e.into()))
        }
    };

    registry.logout_all().await;
    result
}

async fn status(
    registry: &HostRegistry,
    format: OutputFormat,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut sensors: Vec<Entity> = Vec::new();
    setup_sensors(registry, &mut sensors);
    join_all(sensors.iter().map(Entity::refresh)).await;

    let modes: Vec<HostMode> = sensors
        .iter()
        .filter_map(|entity| match entity {
            Entity::Sensor(sensor) => {
                let state = sensor.state();
                Some(HostMode {
                    host: sensor.host().to_owned(),
                    available: sensor.available(),
                    home_mode: state.snapshot.map(|s| s.mode().to_string()),
                })
            }
            _ => None,
        })
        .collect();

    let color = output::should_color(global.color);
    let rendered = output::render_list(
        format,
        &modes,
        |m| HostModeRow {
            host: m.host.clone(),
            mode: output::paint_state(
                if m.available { m.home_mode.as_deref().unwrap_or("-") } else { "unavailable" },
                color,
            ),
        },
        |m| format!("{}\t{}", m.host, m.home_mode.as_deref().unwrap_or("unavailable")),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
