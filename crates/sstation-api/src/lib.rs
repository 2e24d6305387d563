// sstation-api: Async Rust client for the Synology Surveillance Station Web API

pub mod auth;
pub mod camera;
pub mod client;
pub mod error;
pub mod event;
pub mod home_mode;
pub mod mjpeg;
pub mod models;
pub mod stream;
pub mod transport;

pub use auth::{ApiCatalog, ApiEndpoint, ApiName, Session};
pub use client::SurveillanceClient;
pub use error::Error;
pub use mjpeg::{MjpegCodec, MjpegFrame};
pub use models::{CameraRecord, MotionSetting, MotionSource};
pub use stream::{MjpegStream, StreamClient};
pub use transport::{TlsMode, TransportConfig};
