// ── Appliance capability seam ──
//
// Entities, the registry and the controllers talk to an appliance only
// through `RemoteClient`. The production implementation is
// `sstation_api::SurveillanceClient`; tests substitute a scripted fake.

use async_trait::async_trait;
use bytes::Bytes;
use sstation_api::{CameraRecord, Error as ApiError, MotionSetting, SurveillanceClient};
use url::Url;

/// Everything the integration needs from one appliance.
///
/// Implementations share one session across all callers and renew it at
/// most once per failed call. No method retries anything else.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Log in, replacing any existing session.
    async fn authenticate(&self) -> Result<(), ApiError>;

    async fn list_cameras(&self) -> Result<Vec<CameraRecord>, ApiError>;

    async fn get_camera(&self, camera_id: u32) -> Result<CameraRecord, ApiError>;

    /// One still JPEG.
    async fn fetch_image(&self, camera_id: u32) -> Result<Bytes, ApiError>;

    async fn fetch_motion_setting(&self, camera_id: u32) -> Result<MotionSetting, ApiError>;

    async fn set_motion_detection(&self, camera_id: u32, enabled: bool) -> Result<(), ApiError>;

    /// `true` when home mode is on.
    async fn get_home_mode(&self) -> Result<bool, ApiError>;

    /// Request a mode and return the mode the appliance reports afterwards.
    async fn set_home_mode(&self, home: bool) -> Result<bool, ApiError>;

    /// Live MJPEG URL bound to the current session. Contains the sid.
    async fn video_stream_url(&self, camera_id: u32) -> Result<Url, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;
}

#[async_trait]
impl RemoteClient for SurveillanceClient {
    async fn authenticate(&self) -> Result<(), ApiError> {
        SurveillanceClient::authenticate(self).await.map(|_| ())
    }

    async fn list_cameras(&self) -> Result<Vec<CameraRecord>, ApiError> {
        SurveillanceClient::list_cameras(self).await
    }

    async fn get_camera(&self, camera_id: u32) -> Result<CameraRecord, ApiError> {
        SurveillanceClient::get_camera(self, camera_id).await
    }

    async fn fetch_image(&self, camera_id: u32) -> Result<Bytes, ApiError> {
        SurveillanceClient::fetch_image(self, camera_id).await
    }

    async fn fetch_motion_setting(&self, camera_id: u32) -> Result<MotionSetting, ApiError> {
        self.motion_setting(camera_id).await
    }

    async fn set_motion_detection(&self, camera_id: u32, enabled: bool) -> Result<(), ApiError> {
        SurveillanceClient::set_motion_detection(self, camera_id, enabled).await
    }

    async fn get_home_mode(&self) -> Result<bool, ApiError> {
        self.home_mode().await
    }

    async fn set_home_mode(&self, home: bool) -> Result<bool, ApiError> {
        SurveillanceClient::set_home_mode(self, home).await
    }

    async fn video_stream_url(&self, camera_id: u32) -> Result<Url, ApiError> {
        SurveillanceClient::video_stream_url(self, camera_id).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        SurveillanceClient::logout(self).await
    }
}
