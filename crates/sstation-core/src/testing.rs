// Scripted `RemoteClient` for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use sstation_api::{CameraRecord, Error as ApiError, MotionSetting, MotionSource};
use url::Url;

use crate::remote::RemoteClient;

pub(crate) fn camera(id: u32, name: &str) -> CameraRecord {
    CameraRecord {
        id,
        name: None,
        new_name: Some(name.into()),
        enabled: true,
        rec_status: 0,
    }
}

fn offline() -> ApiError {
    ApiError::Timeout { timeout_secs: 5 }
}

#[derive(Default)]
pub(crate) struct FakeClient {
    pub cameras: Mutex<Vec<CameraRecord>>,
    pub motion: Mutex<HashMap<u32, bool>>,
    pub home: AtomicBool,
    /// When set, `set_home_mode` leaves the mode untouched.
    pub ignore_home_mode: AtomicBool,
    pub fail_reads: AtomicBool,
    pub fail_motion: AtomicBool,
    pub fail_writes: AtomicBool,
    pub stream_url: Mutex<Option<Url>>,
    pub write_delay: Mutex<Option<Duration>>,
    pub calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeClient {
    pub fn with_cameras(cameras: Vec<CameraRecord>) -> Self {
        let fake = Self::default();
        *fake.cameras.lock().unwrap() = cameras;
        fake
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_owned());
    }

    fn read_guard(&self) -> Result<(), ApiError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(offline())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteClient for FakeClient {
    async fn authenticate(&self) -> Result<(), ApiError> {
        self.record("authenticate");
        Ok(())
    }

    async fn list_cameras(&self) -> Result<Vec<CameraRecord>, ApiError> {
        self.record("list_cameras");
        self.read_guard()?;
        Ok(self.cameras.lock().unwrap().clone())
    }

    async fn get_camera(&self, camera_id: u32) -> Result<CameraRecord, ApiError> {
        self.record("get_camera");
        self.read_guard()?;
        self.cameras
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == camera_id)
            .cloned()
            .ok_or(ApiError::CameraNotFound { camera_id })
    }

    async fn fetch_image(&self, camera_id: u32) -> Result<Bytes, ApiError> {
        self.record("fetch_image");
        self.read_guard()?;
        Ok(Bytes::from(format!("jpeg-{camera_id}")))
    }

    async fn fetch_motion_setting(&self, camera_id: u32) -> Result<MotionSetting, ApiError> {
        self.record("fetch_motion_setting");
        self.read_guard()?;
        if self.fail_motion.load(Ordering::SeqCst) {
            return Err(offline());
        }
        let enabled = self
            .motion
            .lock()
            .unwrap()
            .get(&camera_id)
            .copied()
            .unwrap_or(true);
        Ok(MotionSetting {
            camera_id,
            source: if enabled {
                MotionSource::SurveillanceStation
            } else {
                MotionSource::Disabled
            },
        })
    }

    async fn set_motion_detection(&self, camera_id: u32, enabled: bool) -> Result<(), ApiError> {
        self.record("set_motion_detection");
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline());
        }
        self.motion.lock().unwrap().insert(camera_id, enabled);
        Ok(())
    }

    async fn get_home_mode(&self) -> Result<bool, ApiError> {
        self.record("get_home_mode");
        self.read_guard()?;
        Ok(self.home.load(Ordering::SeqCst))
    }

    async fn set_home_mode(&self, home: bool) -> Result<bool, ApiError> {
        self.record("set_home_mode");
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.write_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(offline());
        }
        if !self.ignore_home_mode.load(Ordering::SeqCst) {
            self.home.store(home, Ordering::SeqCst);
        }
        Ok(self.home.load(Ordering::SeqCst))
    }

    async fn video_stream_url(&self, _camera_id: u32) -> Result<Url, ApiError> {
        self.record("video_stream_url");
        self.read_guard()?;
        self.stream_url
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Stream("no stream configured".into()))
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.record("logout");
        Ok(())
    }
}
