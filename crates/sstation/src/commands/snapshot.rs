//! Still image capture.

use std::io::Write;

use sstation_core::Streamable;

use crate::cli::{GlobalOpts, SnapshotArgs};
use crate::error::CliError;

use super::util;

pub async fn handle(args: SnapshotArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let connected = util::connect(global).await?;
    let cameras = util::cameras(&connected.registry).await;

    let result = async {
        let camera = util::find_camera(&cameras, &args.camera).ok_or_else(|| CliError::NotFound {
            resource_type: "camera".into(),
            identifier: args.camera.clone(),
            list_command: "cameras".into(),
        })?;

        let image = camera.camera_image().await?;

        match args.file {
            Some(ref path) => {
                tokio::fs::write(path, &image).await?;
                if !global.quiet {
                    eprintln!("Saved {} bytes from {} to {}", image.len(), camera.name(), path.display());
                }
            }
            None => std::io::stdout().lock().write_all(&image)?,
        }
        Ok(())
    }
    .await;

    connected.registry.logout_all().await;
    result
}
