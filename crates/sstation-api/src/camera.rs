// Camera endpoints
//
// Roster, per-camera info, still snapshots, and live stream URLs.

use bytes::Bytes;
use tracing::debug;
use url::Url;

use crate::auth::ApiName;
use crate::client::SurveillanceClient;
use crate::error::Error;
use crate::models::{CameraList, CameraRecord};

impl SurveillanceClient {
    /// List every camera known to the appliance.
    ///
    /// `SYNO.SurveillanceStation.Camera` `List`. An empty roster is `Ok`.
    pub async fn list_cameras(&self) -> Result<Vec<CameraRecord>, Error> {
        debug!("listing cameras");
        let list: CameraList = self
            .call(ApiName::Camera, "List", &[("basic", "true".into())])
            .await?;
        Ok(list.cameras)
    }

    /// Fetch the current record of a single camera.
    ///
    /// `SYNO.SurveillanceStation.Camera` `GetInfo` with `cameraIds={id}`.
    pub async fn get_camera(&self, camera_id: u32) -> Result<CameraRecord, Error> {
        debug!(camera_id, "fetching camera info");
        let list: CameraList = self
            .call(
                ApiName::Camera,
                "GetInfo",
                &[("cameraIds", camera_id.to_string())],
            )
            .await?;
        list.cameras
            .into_iter()
            .find(|c| c.id == camera_id)
            .ok_or(Error::CameraNotFound { camera_id })
    }

    /// Fetch a single still JPEG from a camera.
    ///
    /// `SYNO.SurveillanceStation.Camera` `GetSnapshot`. The appliance answers
    /// errors with a JSON envelope instead of an image, so the content type
    /// decides how the body is read.
    pub async fn fetch_image(&self, camera_id: u32) -> Result<Bytes, Error> {
        debug!(camera_id, "fetching snapshot");
        self.with_session(|session| async move {
            let resp = self
                .send(
                    &session,
                    ApiName::Camera,
                    "GetSnapshot",
                    &[("cameraId", camera_id.to_string())],
                )
                .await?;

            let is_json = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.starts_with("application/json") || ct.starts_with("text/"));

            if is_json {
                let _: Option<serde_json::Value> = Self::parse_envelope(resp).await?;
                return Err(Error::Deserialization {
                    message: "expected image data, got a JSON envelope".into(),
                    body: String::new(),
                });
            }

            let status = resp.status();
            if !status.is_success() {
                return Err(Error::Http {
                    status: status.as_u16(),
                    message: "snapshot request failed".into(),
                });
            }
            Ok(resp.bytes().await?)
        })
        .await
    }

    /// URL of the camera's live MJPEG stream, bound to the current session.
    ///
    /// `SYNO.SurveillanceStation.VideoStreaming` `Stream` with `format=mjpeg`.
    /// The URL embeds the sid and must not be logged.
    pub async fn video_stream_url(&self, camera_id: u32) -> Result<Url, Error> {
        let session = self.session().await?;
        self.method_url(
            &session,
            ApiName::VideoStreaming,
            "Stream",
            &[
                ("cameraId", camera_id.to_string()),
                ("format", "mjpeg".into()),
            ],
        )
    }
}
