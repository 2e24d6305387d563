// ── MJPEG stream reverse proxy ──
//
// Relays a camera's live stream to one viewer. Each viewer gets its own
// upstream connection; frames are re-framed under the proxy's boundary and
// forwarded one at a time, so at most one frame per session is ever held in
// memory and a slow viewer slows the upstream read instead of growing a
// buffer.

use std::time::Duration;

use bytes::Bytes;
use futures_core::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use sstation_api::{Error as ApiError, MjpegCodec, MjpegFrame, MjpegStream, StreamClient, TransportConfig};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

/// Boundary used on the downstream side of every proxied stream.
pub const PROXY_BOUNDARY: &str = "sstationframe";

/// Why a viewing session ended abnormally. Only that session is affected.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Could not open camera stream: {0}")]
    Connect(#[source] ApiError),

    #[error("Camera stream failed: {0}")]
    Upstream(#[source] ApiError),

    #[error("No frame from camera within {timeout_secs}s")]
    ReadTimeout { timeout_secs: u64 },

    #[error("Viewer disconnected after {frames} frames")]
    DownstreamClosed { frames: u64 },
}

/// How a relay that did not fail came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The camera closed the stream.
    UpstreamEnded { frames: u64 },
    /// The session was cancelled from outside (shutdown, entity removed).
    Cancelled { frames: u64 },
}

impl StreamError {
    /// The camera was too slow, either to answer or to send the next frame.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::ReadTimeout { .. } => true,
            Self::Connect(e) | Self::Upstream(e) => match e {
                ApiError::Timeout { .. } => true,
                ApiError::Transport(e) => e.is_timeout(),
                _ => false,
            },
            Self::DownstreamClosed { .. } => false,
        }
    }
}

impl RelayOutcome {
    pub fn frames(self) -> u64 {
        match self {
            Self::UpstreamEnded { frames } | Self::Cancelled { frames } => frames,
        }
    }
}

/// Per-host stream proxy.
///
/// Holds the host's TLS settings in a dedicated HTTP client; the URL (which
/// carries the session id) is supplied per viewing session.
#[derive(Debug)]
pub struct StreamProxy {
    client: StreamClient,
    read_timeout: Duration,
    codec: MjpegCodec,
}

impl StreamProxy {
    /// Build the proxy for a host. The transport timeout bounds opening the
    /// upstream and each wait for the next frame.
    pub fn new(transport: &TransportConfig) -> Result<Self, ApiError> {
        Ok(Self::with_client(
            StreamClient::new(transport)?,
            transport.timeout,
        ))
    }

    pub fn with_client(client: StreamClient, read_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
            codec: MjpegCodec::new(PROXY_BOUNDARY),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// `Content-Type` of the bytes this proxy writes downstream.
    pub fn content_type(&self) -> String {
        self.codec.content_type()
    }

    /// Open `url` without reading any frame yet.
    pub async fn open(&self, url: Url) -> Result<MjpegStream, StreamError> {
        self.client.open(url).await.map_err(StreamError::Connect)
    }

    /// Open `url` and relay it into `sink` until one side ends or `cancel`
    /// fires.
    pub async fn proxy<S>(
        &self,
        url: Url,
        sink: S,
        cancel: &CancellationToken,
    ) -> Result<RelayOutcome, StreamError>
    where
        S: Sink<Bytes> + Unpin,
    {
        let upstream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(RelayOutcome::Cancelled { frames: 0 }),
            opened = self.open(url) => opened?,
        };
        self.relay(upstream, sink, cancel).await
    }

    /// Relay an already opened upstream.
    pub async fn relay<S>(
        &self,
        upstream: MjpegStream,
        sink: S,
        cancel: &CancellationToken,
    ) -> Result<RelayOutcome, StreamError>
    where
        S: Sink<Bytes> + Unpin,
    {
        let result = relay(upstream, sink, &self.codec, self.read_timeout, cancel).await;
        match &result {
            Ok(outcome) => info!(frames = outcome.frames(), ?outcome, "stream session ended"),
            Err(e) => info!(error = %e, "stream session ended"),
        }
        result
    }
}

/// Forward frames from `frames` to `sink`, re-encoded with `codec`.
///
/// One frame is read (bounded by `read_timeout`), written, and only then is
/// the next one read. Returns as soon as either side ends; `frames` is
/// dropped on return, which closes the upstream connection.
pub async fn relay<F, S>(
    mut frames: F,
    mut sink: S,
    codec: &MjpegCodec,
    read_timeout: Duration,
    cancel: &CancellationToken,
) -> Result<RelayOutcome, StreamError>
where
    F: Stream<Item = Result<MjpegFrame, ApiError>> + Unpin,
    S: Sink<Bytes> + Unpin,
{
    let mut sent: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(RelayOutcome::Cancelled { frames: sent }),
            next = tokio::time::timeout(read_timeout, frames.next()) => next,
        };

        let frame = match next {
            Err(_) => {
                return Err(StreamError::ReadTimeout {
                    timeout_secs: read_timeout.as_secs(),
                });
            }
            Ok(None) => {
                if sink.close().await.is_err() {
                    debug!(frames = sent, "downstream already closed at end of stream");
                }
                return Ok(RelayOutcome::UpstreamEnded { frames: sent });
            }
            Ok(Some(Err(e))) => return Err(StreamError::Upstream(e)),
            Ok(Some(Ok(frame))) => frame,
        };

        let part = codec.encode_part(&frame);
        let written = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(RelayOutcome::Cancelled { frames: sent }),
            written = sink.send(part) => written.is_ok(),
        };
        if !written {
            debug!(frames = sent, "downstream closed");
            return Err(StreamError::DownstreamClosed { frames: sent });
        }
        sent += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use futures_util::stream;
    use tokio::sync::mpsc;
    use tokio_util::sync::PollSender;

    use super::*;

    /// Upstream stand-in that counts reads and records when it is dropped.
    struct Upstream<S> {
        inner: S,
        reads: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    }

    impl<S: Stream + Unpin> Stream for Upstream<S> {
        type Item = S::Item;

        fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<S::Item>> {
            let polled = Pin::new(&mut self.inner).poll_next(cx);
            if polled.is_ready() {
                self.reads.fetch_add(1, Ordering::SeqCst);
            }
            polled
        }
    }

    impl<S> Drop for Upstream<S> {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    fn upstream<S>(inner: S) -> (Upstream<S>, Arc<AtomicBool>) {
        let (up, _, dropped) = counted_upstream(inner);
        (up, dropped)
    }

    fn counted_upstream<S>(inner: S) -> (Upstream<S>, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let reads = Arc::new(AtomicUsize::new(0));
        let dropped = Arc::new(AtomicBool::new(false));
        (
            Upstream {
                inner,
                reads: Arc::clone(&reads),
                dropped: Arc::clone(&dropped),
            },
            reads,
            dropped,
        )
    }

    fn frames(n: u8) -> Vec<Result<MjpegFrame, ApiError>> {
        (0..n).map(|i| Ok(MjpegFrame::jpeg(vec![0xff, 0xd8, i]))).collect()
    }

    fn codec() -> MjpegCodec {
        MjpegCodec::new(PROXY_BOUNDARY)
    }

    #[tokio::test]
    async fn three_frames_then_clean_end() {
        let (up, dropped) = upstream(stream::iter(frames(3)));
        let mut out: Vec<Bytes> = Vec::new();

        let outcome = relay(
            up,
            &mut out,
            &codec(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, RelayOutcome::UpstreamEnded { frames: 3 });
        assert_eq!(out.len(), 3);
        assert_eq!(out[2], codec().encode_part(&MjpegFrame::jpeg(vec![0xff, 0xd8, 2])));
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn downstream_disconnect_stops_relay_and_drops_upstream() {
        // Endless upstream: only the viewer going away can end this session.
        let endless = stream::repeat_with(|| Ok(MjpegFrame::jpeg(vec![0xff, 0xd8])));
        let (up, reads, dropped) = counted_upstream(endless);
        let (tx, mut rx) = mpsc::channel::<Bytes>(1);

        let viewer = tokio::spawn(async move {
            let first = rx.recv().await;
            drop(rx);
            first
        });

        let result = relay(
            up,
            PollSender::new(tx),
            &codec(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        assert!(viewer.await.unwrap().is_some());
        let Err(StreamError::DownstreamClosed { frames }) = result else {
            panic!("expected the viewer disconnect to end the session, got {result:?}");
        };
        // Frames that made it into the one-slot channel, plus the single
        // frame whose write found the viewer gone. Nothing is read ahead.
        let reads = reads.load(Ordering::SeqCst) as u64;
        assert!(reads <= frames + 1, "read {reads} frames but only {frames} were sent");
        assert!(frames <= 2);
        assert!(dropped.load(Ordering::SeqCst));
    }

    /// Sink that accepts every part but refuses to close.
    struct UnclosableSink(Vec<Bytes>);

    impl Sink<Bytes> for UnclosableSink {
        type Error = &'static str;

        fn poll_ready(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, item: Bytes) -> Result<(), Self::Error> {
            self.0.push(item);
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Err("already closed"))
        }
    }

    #[tokio::test]
    async fn failed_close_still_counts_as_clean_end() {
        let mut sink = UnclosableSink(Vec::new());

        let outcome = relay(
            stream::iter(frames(2)),
            &mut sink,
            &codec(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(outcome, RelayOutcome::UpstreamEnded { frames: 2 });
        assert_eq!(sink.0.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_upstream_times_out() {
        let (up, dropped) = upstream(stream::pending::<Result<MjpegFrame, ApiError>>());
        let mut out: Vec<Bytes> = Vec::new();

        let result = relay(
            up,
            &mut out,
            &codec(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StreamError::ReadTimeout { timeout_secs: 5 })));
        assert!(out.is_empty());
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn upstream_error_ends_session() {
        let mut items = frames(1);
        items.push(Err(ApiError::Stream("connection reset".into())));
        let mut out: Vec<Bytes> = Vec::new();

        let result = relay(
            stream::iter(items),
            &mut out,
            &codec(),
            Duration::from_secs(5),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(StreamError::Upstream(_))));
        assert_eq!(out.len(), 1);
    }

    #[tokio::test]
    async fn cancellation_ends_session() {
        let (up, dropped) = upstream(stream::pending::<Result<MjpegFrame, ApiError>>());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out: Vec<Bytes> = Vec::new();

        let outcome = relay(up, &mut out, &codec(), Duration::from_secs(5), &cancel)
            .await
            .unwrap();

        assert_eq!(outcome, RelayOutcome::Cancelled { frames: 0 });
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[test]
    fn timeouts_are_told_apart_from_other_failures() {
        assert!(StreamError::ReadTimeout { timeout_secs: 5 }.is_timeout());
        assert!(StreamError::Connect(ApiError::Timeout { timeout_secs: 5 }).is_timeout());
        assert!(!StreamError::Connect(ApiError::Stream("bad content type".into())).is_timeout());
        assert!(!StreamError::DownstreamClosed { frames: 1 }.is_timeout());
    }

    #[tokio::test]
    async fn refused_upstream_fails_to_open() {
        let proxy = StreamProxy::new(&TransportConfig::default()).unwrap();
        let url = Url::parse("http://127.0.0.1:1/stream").unwrap();

        let err = proxy.open(url).await.unwrap_err();
        assert!(matches!(err, StreamError::Connect(_)));
        assert!(!err.is_timeout());
    }

    #[test]
    fn downstream_content_type_uses_proxy_boundary() {
        let proxy = StreamProxy::new(&TransportConfig::default()).unwrap();
        assert_eq!(
            proxy.content_type(),
            "multipart/x-mixed-replace; boundary=sstationframe"
        );
        assert_eq!(proxy.read_timeout(), Duration::from_secs(5));
    }
}
