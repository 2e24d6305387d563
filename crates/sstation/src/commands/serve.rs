//! `serve`: a small host runtime for the integration.
//!
//! Registers every entity, polls them on an interval and exposes them over
//! HTTP. Each stream request opens its upstream before answering, then gets
//! its own relay task writing into a one-slot channel, so a slow viewer
//! holds back its own upstream and nothing else.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;
use futures_util::{SinkExt, future};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, PollSendError, PollSender};
use tracing::{debug, error, info, warn};

use sstation_core::{
    CameraEntity, CommandError, CoreError, Entity, EntityView, HomeModeController, PollScheduler,
    SetHomeModeCall, StreamError, Streamable, Toggleable, setup_cameras, setup_sensors,
    setup_switches,
};

use crate::cli::{GlobalOpts, ServeArgs};
use crate::error::CliError;

use super::util;

// ── State ────────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    entities: Arc<Vec<Entity>>,
    controller: HomeModeController,
    /// Cancelled on shutdown; every stream session runs on a child token.
    shutdown: CancellationToken,
}

impl AppState {
    fn camera(&self, host: &str, camera_id: u32) -> Result<&Arc<CameraEntity>, HttpError> {
        self.entities
            .iter()
            .filter_map(Entity::as_camera)
            .find(|c| c.host() == host && c.camera_id() == camera_id)
            .ok_or_else(|| HttpError::not_found(format!("no camera {camera_id} on host '{host}'")))
    }
}

// ── Errors ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct HttpError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl HttpError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            status: self.status.as_u16(),
        });
        (self.status, body).into_response()
    }
}

impl From<CoreError> for HttpError {
    fn from(err: CoreError) -> Self {
        let status = match err {
            CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            CoreError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CoreError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            CoreError::ConnectionFailed { .. }
            | CoreError::AuthenticationFailed { .. }
            | CoreError::Api { .. } => StatusCode::BAD_GATEWAY,
            CoreError::Config { .. } | CoreError::Internal(_) => {
                error!(error = %err, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, err.to_string())
    }
}

impl From<StreamError> for HttpError {
    fn from(err: StreamError) -> Self {
        let status = if err.is_timeout() {
            StatusCode::GATEWAY_TIMEOUT
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self::new(status, err.to_string())
    }
}

impl From<CommandError> for HttpError {
    fn from(err: CommandError) -> Self {
        let status = match err {
            CommandError::UnknownHost { .. } => StatusCode::NOT_FOUND,
            CommandError::NotConfirmed { .. } => StatusCode::CONFLICT,
            CommandError::Remote { .. } => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

// ── Routes ───────────────────────────────────────────────────────────

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/entities", get(list_entities))
        .route("/api/cameras/{host}/{camera_id}/image", get(camera_image))
        .route("/api/cameras/{host}/{camera_id}/stream", get(camera_stream))
        .route("/api/cameras/{host}/{camera_id}/motion", post(set_motion))
        .route("/api/switches/{host}/{action}", post(switch_action))
        .route("/api/services/set_home_mode", post(set_home_mode))
        .with_state(state)
}

/// GET /api/entities
async fn list_entities(State(state): State<AppState>) -> Json<Vec<EntityView>> {
    Json(state.entities.iter().map(Entity::view).collect())
}

/// GET /api/cameras/{host}/{camera_id}/image
async fn camera_image(
    State(state): State<AppState>,
    Path((host, camera_id)): Path<(String, u32)>,
) -> Result<Response, HttpError> {
    let image = state.camera(&host, camera_id)?.camera_image().await?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], image).into_response())
}

/// GET /api/cameras/{host}/{camera_id}/stream
async fn camera_stream(
    State(state): State<AppState>,
    Path((host, camera_id)): Path<(String, u32)>,
) -> Result<Response, HttpError> {
    let camera = Arc::clone(state.camera(&host, camera_id)?);
    let upstream = camera.open_stream().await?;
    let content_type = camera.stream_content_type();
    let cancel = state.shutdown.child_token();
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
    let failed = tx.clone();

    tokio::spawn(async move {
        let entity = camera.unique_id();
        let parts = PollSender::new(tx)
            .with(|part: Bytes| future::ready(Ok::<_, PollSendError<io::Result<Bytes>>>(Ok(part))));
        match camera.relay_stream(upstream, parts, cancel).await {
            Ok(outcome) => debug!(%entity, ?outcome, "stream session finished"),
            Err(StreamError::DownstreamClosed { frames }) => {
                debug!(%entity, frames, "viewer went away");
            }
            Err(e) => {
                warn!(%entity, error = %e, "stream session failed");
                // An error item aborts the chunked body instead of ending it.
                if failed.send(Err(io::Error::other(e.to_string()))).await.is_err() {
                    debug!(%entity, "viewer gone before the failure could be reported");
                }
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "no-cache, no-store")
        .body(body)
        .map_err(|e| HttpError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[derive(Debug, Deserialize)]
struct MotionRequest {
    enabled: bool,
}

/// POST /api/cameras/{host}/{camera_id}/motion
async fn set_motion(
    State(state): State<AppState>,
    Path((host, camera_id)): Path<(String, u32)>,
    Json(request): Json<MotionRequest>,
) -> Result<StatusCode, HttpError> {
    state
        .camera(&host, camera_id)?
        .set_motion_detection(request.enabled)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/switches/{host}/turn_on|turn_off
async fn switch_action(
    State(state): State<AppState>,
    Path((host, action)): Path<(String, String)>,
) -> Result<StatusCode, HttpError> {
    let switch = state
        .entities
        .iter()
        .filter_map(Entity::as_switch)
        .find(|s| s.host() == host)
        .ok_or_else(|| HttpError::not_found(format!("no home mode switch on host '{host}'")))?;

    match action.as_str() {
        "turn_on" => switch.turn_on().await?,
        "turn_off" => switch.turn_off().await?,
        other => return Err(HttpError::not_found(format!("unknown switch action '{other}'"))),
    }
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/services/set_home_mode
async fn set_home_mode(
    State(state): State<AppState>,
    Json(call): Json<SetHomeModeCall>,
) -> Result<StatusCode, HttpError> {
    state.controller.handle(&call).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Command ──────────────────────────────────────────────────────────

pub async fn handle(args: ServeArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let connected = util::connect(global).await?;
    let registry = connected.registry;

    let poll_interval = match args.poll_interval {
        Some(0) => {
            return Err(CliError::Validation {
                field: "--poll-interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Some(secs) => Duration::from_secs(secs),
        None => connected.config.poll_interval()?,
    };
    let listen = args
        .listen
        .unwrap_or_else(|| connected.config.defaults.listen.clone());

    let mut entities = Vec::new();
    let cameras = setup_cameras(&registry, &mut entities).await;
    let sensors = setup_sensors(&registry, &mut entities);
    let switches = setup_switches(&registry, &mut entities);
    info!(hosts = registry.len(), cameras, sensors, switches, "entities registered");

    let listener = TcpListener::bind(&listen)
        .await
        .map_err(|source| CliError::Bind {
            addr: listen.clone(),
            source,
        })?;

    let scheduler = PollScheduler::start(&entities, poll_interval);
    let shutdown = CancellationToken::new();
    let app = router(AppState {
        entities: Arc::new(entities),
        controller: HomeModeController::new(Arc::clone(&registry)),
        shutdown: shutdown.clone(),
    });

    info!(addr = %listen, poll_secs = poll_interval.as_secs(), "serving");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "could not listen for ctrl-c");
            }
            info!("shutting down");
            // Ends every open stream so the graceful drain can finish.
            shutdown.cancel();
        })
        .await;

    scheduler.shutdown().await;
    registry.logout_all().await;
    served?;
    Ok(())
}
