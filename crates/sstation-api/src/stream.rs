// Upstream MJPEG stream opener
//
// Opens a camera's live stream and exposes it as a `Stream` of decoded
// frames. The body is pulled from the socket only as fast as frames are
// consumed, so the caller controls backpressure.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::TryStreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::mjpeg::{MjpegCodec, MjpegFrame, boundary_from_content_type};
use crate::transport::TransportConfig;

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// HTTP client dedicated to long-lived stream bodies.
#[derive(Debug, Clone)]
pub struct StreamClient {
    http: reqwest::Client,
    open_timeout: Duration,
}

impl StreamClient {
    /// Build from the host's transport settings. The transport timeout
    /// bounds connecting and waiting for the response head, not the body.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_stream_client()?,
            open_timeout: transport.timeout,
        })
    }

    pub fn with_client(http: reqwest::Client, open_timeout: Duration) -> Self {
        Self { http, open_timeout }
    }

    /// Open `url` and start decoding it as `multipart/x-mixed-replace`.
    ///
    /// The URL carries a session id, so only its origin and path are logged.
    pub async fn open(&self, url: Url) -> Result<MjpegStream, Error> {
        debug!("opening stream {}{}", url.origin().ascii_serialization(), url.path());

        let resp = tokio::time::timeout(self.open_timeout, self.http.get(url).send())
            .await
            .map_err(|_| Error::Timeout {
                timeout_secs: self.open_timeout.as_secs(),
            })??;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                message: "upstream stream request failed".into(),
            });
        }

        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        let boundary = boundary_from_content_type(&content_type).ok_or_else(|| {
            Error::Stream(format!("expected a multipart stream, got {content_type:?}"))
        })?;

        debug!(%boundary, "upstream stream accepted");
        Ok(MjpegStream::from_byte_stream(
            &boundary,
            resp.bytes_stream().map_err(io::Error::other),
        ))
    }
}

/// Decoded frames of one upstream MJPEG response.
///
/// Dropping the stream drops the response and closes the connection.
pub struct MjpegStream {
    frames: FramedRead<StreamReader<ByteStream, Bytes>, MjpegCodec>,
}

impl MjpegStream {
    /// Decode any byte stream delimited by `boundary`.
    pub fn from_byte_stream<S>(boundary: &str, bytes: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        let bytes: ByteStream = Box::pin(bytes);
        Self {
            frames: FramedRead::new(StreamReader::new(bytes), MjpegCodec::new(boundary)),
        }
    }

    /// The upstream boundary this stream is split on.
    pub fn boundary(&self) -> &str {
        self.frames.decoder().boundary()
    }
}

impl Stream for MjpegStream {
    type Item = Result<MjpegFrame, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

impl std::fmt::Debug for MjpegStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MjpegStream")
            .field("boundary", &self.boundary())
            .finish_non_exhaustive()
    }
}
