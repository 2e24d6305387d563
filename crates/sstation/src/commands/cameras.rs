//! Camera listing.

use futures_util::future::join_all;
use serde::Serialize;
use tabled::Tabled;

use sstation_core::Refreshable;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct CameraListing {
    unique_id: String,
    host: String,
    camera_id: u32,
    name: String,
    available: bool,
    state: Option<String>,
    is_recording: Option<bool>,
    motion_detection_enabled: Option<bool>,
}

#[derive(Tabled)]
struct CameraRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "ID")]
    id: u32,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Motion")]
    motion: String,
}

fn yes_no(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "enabled",
        Some(false) => "disabled",
        None => "-",
    }
}

pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let connected = util::connect(global).await?;
    let cameras = util::cameras(&connected.registry).await;

    join_all(cameras.iter().map(|c| c.refresh())).await;

    let listings: Vec<CameraListing> = cameras
        .iter()
        .map(|c| {
            let state = c.state();
            CameraListing {
                unique_id: c.unique_id(),
                host: c.host().to_owned(),
                camera_id: c.camera_id(),
                name: c.name(),
                available: state.available,
                state: state.snapshot.as_ref().map(|s| s.state().to_owned()),
                is_recording: c.is_recording(),
                motion_detection_enabled: c.motion_detection_enabled(),
            }
        })
        .collect();

    let format = util::output_format(&connected.config, global)?;
    let color = output::should_color(global.color);
    let rendered = output::render_list(
        format,
        &listings,
        |l| CameraRow {
            host: l.host.clone(),
            id: l.camera_id,
            name: l.name.clone(),
            state: output::paint_state(
                if l.available { l.state.as_deref().unwrap_or("-") } else { "unavailable" },
                color,
            ),
            motion: output::paint_state(yes_no(l.motion_detection_enabled), color),
        },
        |l| l.unique_id.clone(),
    )?;
    output::print_output(&rendered, global.quiet);

    connected.registry.logout_all().await;
    Ok(())
}
