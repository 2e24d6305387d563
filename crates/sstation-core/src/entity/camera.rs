// ── Camera entity ──

use std::sync::Arc;

use bytes::Bytes;
use futures_util::Sink;
use serde::Serialize;
use serde_json::json;
use sstation_api::{CameraRecord, MjpegStream, MotionSetting};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::{EntityState, StateCell};
use super::{EntityKind, EntityView, Refreshable, Streamable};
use crate::error::CoreError;
use crate::proxy::{RelayOutcome, StreamError, StreamProxy};
use crate::remote::RemoteClient;

/// What one poll of a camera observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CameraSnapshot {
    pub camera_id: u32,
    pub name: String,
    /// The camera is enabled on the appliance and can be streamed.
    pub is_streaming: bool,
    pub is_recording: bool,
    pub motion_detection_enabled: bool,
}

impl CameraSnapshot {
    fn new(record: &CameraRecord, motion: MotionSetting) -> Self {
        Self {
            camera_id: record.id,
            name: record.display_name().to_owned(),
            is_streaming: record.enabled,
            is_recording: record.is_recording(),
            motion_detection_enabled: motion.is_enabled(),
        }
    }

    /// `recording`, `streaming` or `idle`.
    pub fn state(&self) -> &'static str {
        if self.is_recording {
            "recording"
        } else if self.is_streaming {
            "streaming"
        } else {
            "idle"
        }
    }
}

/// One camera on one host.
///
/// The live stream URL is resolved per viewing session, so a renewed
/// session id is always picked up.
pub struct CameraEntity {
    host: String,
    camera_id: u32,
    /// Display name at setup, used until the first poll succeeds.
    setup_name: String,
    client: Arc<dyn RemoteClient>,
    proxy: Arc<StreamProxy>,
    state: StateCell<CameraSnapshot>,
}

impl CameraEntity {
    pub fn new(
        host: impl Into<String>,
        record: &CameraRecord,
        client: Arc<dyn RemoteClient>,
        proxy: Arc<StreamProxy>,
    ) -> Self {
        Self {
            host: host.into(),
            camera_id: record.id,
            setup_name: record.display_name().to_owned(),
            client,
            proxy,
            state: StateCell::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn camera_id(&self) -> u32 {
        self.camera_id
    }

    pub fn unique_id(&self) -> String {
        format!("{}:camera:{}", self.host, self.camera_id)
    }

    pub fn name(&self) -> String {
        self.state
            .current()
            .snapshot
            .map_or_else(|| self.setup_name.clone(), |s| s.name)
    }

    pub fn state(&self) -> EntityState<CameraSnapshot> {
        self.state.current()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<EntityState<CameraSnapshot>> {
        self.state.subscribe()
    }

    pub fn is_recording(&self) -> Option<bool> {
        self.state.current().snapshot.map(|s| s.is_recording)
    }

    pub fn motion_detection_enabled(&self) -> Option<bool> {
        self.state
            .current()
            .snapshot
            .map(|s| s.motion_detection_enabled)
    }

    /// Turn motion detection on at the appliance. The snapshot is left alone;
    /// the next poll picks up the change.
    pub async fn enable_motion_detection(&self) -> Result<(), CoreError> {
        self.set_motion_detection(true).await
    }

    pub async fn disable_motion_detection(&self) -> Result<(), CoreError> {
        self.set_motion_detection(false).await
    }

    pub async fn set_motion_detection(&self, enabled: bool) -> Result<(), CoreError> {
        debug!(entity = %self.unique_id(), enabled, "setting motion detection");
        self.client
            .set_motion_detection(self.camera_id, enabled)
            .await
            .map_err(CoreError::from)
    }

    /// Resolve the session-bound URL and open the upstream stream.
    ///
    /// Nothing is read yet, so a caller can report a failed open before it
    /// commits to a response.
    pub async fn open_stream(&self) -> Result<MjpegStream, StreamError> {
        let url = self
            .client
            .video_stream_url(self.camera_id)
            .await
            .map_err(StreamError::Connect)?;
        debug!(entity = %self.unique_id(), "opening stream session");
        self.proxy.open(url).await
    }

    /// Relay a stream opened with [`open_stream`](Self::open_stream).
    pub async fn relay_stream<S>(
        &self,
        upstream: MjpegStream,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RelayOutcome, StreamError>
    where
        S: Sink<Bytes> + Unpin,
    {
        self.proxy.relay(upstream, sink, &cancel).await
    }

    pub fn view(&self) -> EntityView {
        let current = self.state.current();
        let attributes = current.snapshot.as_ref().map_or(serde_json::Value::Null, |s| {
            json!({
                "camera_id": s.camera_id,
                "is_streaming": s.is_streaming,
                "is_recording": s.is_recording,
                "motion_detection_enabled": s.motion_detection_enabled,
            })
        });
        EntityView {
            unique_id: self.unique_id(),
            host: self.host.clone(),
            kind: EntityKind::Camera,
            name: self.name(),
            state: current.snapshot.as_ref().map(|s| s.state().to_owned()),
            available: current.available,
            icon: None,
            last_updated: current.last_updated,
            attributes,
        }
    }
}

impl Refreshable for CameraEntity {
    async fn refresh(&self) {
        let (camera, motion) = tokio::join!(
            self.client.get_camera(self.camera_id),
            self.client.fetch_motion_setting(self.camera_id),
        );
        match camera.and_then(|camera| motion.map(|motion| CameraSnapshot::new(&camera, motion))) {
            Ok(snapshot) => self.state.publish(snapshot),
            Err(e) => {
                warn!(entity = %self.unique_id(), error = %e, "camera poll failed, keeping last state");
                self.state.mark_unavailable();
            }
        }
    }

    fn available(&self) -> bool {
        self.state.available()
    }
}

impl Streamable for CameraEntity {
    async fn camera_image(&self) -> Result<Bytes, CoreError> {
        Ok(self.client.fetch_image(self.camera_id).await?)
    }

    async fn stream_mjpeg<S>(
        &self,
        sink: S,
        cancel: CancellationToken,
    ) -> Result<RelayOutcome, StreamError>
    where
        S: Sink<Bytes> + Send + Unpin,
    {
        let url = self
            .client
            .video_stream_url(self.camera_id)
            .await
            .map_err(StreamError::Connect)?;
        debug!(entity = %self.unique_id(), "starting stream session");
        self.proxy.proxy(url, sink, &cancel).await
    }

    fn stream_content_type(&self) -> String {
        self.proxy.content_type()
    }
}
