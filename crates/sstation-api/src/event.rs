// Camera event endpoints
//
// Motion detection settings live under `SYNO.SurveillanceStation.Camera.Event`.

use tracing::debug;

use crate::auth::ApiName;
use crate::client::SurveillanceClient;
use crate::error::Error;
use crate::models::{MotionEnumData, MotionSetting, MotionSource};

impl SurveillanceClient {
    /// Read the motion detection setting of a camera.
    ///
    /// `SYNO.SurveillanceStation.Camera.Event` `MotionEnum` with `camId={id}`.
    pub async fn motion_setting(&self, camera_id: u32) -> Result<MotionSetting, Error> {
        debug!(camera_id, "fetching motion setting");
        let data: MotionEnumData = self
            .call(
                ApiName::CameraEvent,
                "MotionEnum",
                &[("camId", camera_id.to_string())],
            )
            .await?;
        Ok(MotionSetting {
            camera_id,
            source: data.md_param.source,
        })
    }

    /// Enable or disable motion detection on a camera.
    ///
    /// `MDParamSave` with `source=1` (detected by Surveillance Station) or
    /// `source=-1` (disabled).
    pub async fn set_motion_detection(&self, camera_id: u32, enabled: bool) -> Result<(), Error> {
        let source = if enabled {
            MotionSource::SurveillanceStation
        } else {
            MotionSource::Disabled
        };
        debug!(camera_id, enabled, "saving motion setting");
        self.call_unit(
            ApiName::CameraEvent,
            "MDParamSave",
            &[
                ("camId", camera_id.to_string()),
                ("source", i64::from(source).to_string()),
                ("keep", "true".into()),
            ],
        )
        .await
    }
}
