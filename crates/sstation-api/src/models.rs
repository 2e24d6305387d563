// Web API wire models
//
// Serde types for the `data` payloads of the `{ success, data, error }`
// envelope. Only the fields this workspace reads are modelled; everything
// else in the appliance's responses is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The standard Web API response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: i64,
}

/// One entry of the `SYNO.API.Info` `Query` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiInfoEntry {
    pub path: String,
    pub min_version: u32,
    pub max_version: u32,
}

pub(crate) type ApiInfoMap = HashMap<String, ApiInfoEntry>;

/// `SYNO.API.Auth` `Login` response.
#[derive(Debug, Deserialize)]
pub(crate) struct LoginData {
    pub sid: String,
}

/// `SYNO.SurveillanceStation.Camera` `List` / `GetInfo` response.
#[derive(Debug, Deserialize)]
pub(crate) struct CameraList {
    #[serde(default)]
    pub cameras: Vec<CameraRecord>,
}

/// A camera as reported by the appliance.
///
/// Newer API versions report the display name as `newName`; older ones as
/// `name`. [`display_name`](Self::display_name) picks whichever is present.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraRecord {
    pub id: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    /// Recording status; zero means idle.
    #[serde(default)]
    pub rec_status: i64,
}

impl CameraRecord {
    pub fn display_name(&self) -> &str {
        self.new_name
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.rec_status != 0
    }
}

/// Motion detection source, as encoded in `MDParam.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MotionSource {
    Disabled,
    Camera,
    SurveillanceStation,
    Other(i64),
}

impl From<i64> for MotionSource {
    fn from(raw: i64) -> Self {
        match raw {
            -1 => Self::Disabled,
            0 => Self::Camera,
            1 => Self::SurveillanceStation,
            other => Self::Other(other),
        }
    }
}

impl From<MotionSource> for i64 {
    fn from(source: MotionSource) -> Self {
        match source {
            MotionSource::Disabled => -1,
            MotionSource::Camera => 0,
            MotionSource::SurveillanceStation => 1,
            MotionSource::Other(raw) => raw,
        }
    }
}

/// `SYNO.SurveillanceStation.Camera.Event` `MotionEnum` response.
#[derive(Debug, Deserialize)]
pub(crate) struct MotionEnumData {
    #[serde(rename = "MDParam")]
    pub md_param: MotionParam,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MotionParam {
    pub source: MotionSource,
}

/// Motion detection setting for one camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotionSetting {
    pub camera_id: u32,
    pub source: MotionSource,
}

impl MotionSetting {
    pub fn is_enabled(&self) -> bool {
        self.source != MotionSource::Disabled
    }
}

/// `SYNO.SurveillanceStation.HomeMode` `GetInfo` response.
#[derive(Debug, Deserialize)]
pub(crate) struct HomeModeInfo {
    pub on: bool,
}
