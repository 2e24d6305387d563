// MJPEG multipart-replace codec
//
// Splits a `multipart/x-mixed-replace` body into individual parts and
// writes parts back out under a given boundary. Parts with a
// `Content-Length` header are cut by length; parts without one are cut at
// the next delimiter. Every part is bounded by `max_frame` so a misbehaving
// upstream cannot grow the buffer without limit.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::Error;

/// Largest single part the decoder will buffer.
pub const DEFAULT_MAX_FRAME: usize = 8 * 1024 * 1024;

const DEFAULT_PART_TYPE: &str = "image/jpeg";

/// One part of an MJPEG stream: normally a single JPEG image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MjpegFrame {
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl MjpegFrame {
    pub fn jpeg(data: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(DEFAULT_PART_TYPE.into()),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    /// Looking for the next `--boundary` line.
    Delimiter,
    /// Reading part headers up to the blank line.
    Headers,
    /// Reading the part body.
    Body {
        content_type: Option<String>,
        length: Option<usize>,
    },
    /// Saw the closing `--boundary--`.
    Closed,
}

/// `tokio_util` codec for multipart-replace bodies.
#[derive(Debug, Clone)]
pub struct MjpegCodec {
    boundary: String,
    delimiter: Vec<u8>,
    max_frame: usize,
    state: State,
    /// Bytes of the buffer already searched without finding a delimiter.
    scanned: usize,
}

impl MjpegCodec {
    pub fn new(boundary: &str) -> Self {
        Self {
            boundary: boundary.to_owned(),
            delimiter: format!("--{boundary}").into_bytes(),
            max_frame: DEFAULT_MAX_FRAME,
            state: State::Delimiter,
            scanned: 0,
        }
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value matching this codec's boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/x-mixed-replace; boundary={}", self.boundary)
    }

    /// Encode one frame as a complete part, including its delimiter line.
    pub fn encode_part(&self, frame: &MjpegFrame) -> Bytes {
        let content_type = frame.content_type.as_deref().unwrap_or(DEFAULT_PART_TYPE);
        let head = format!(
            "--{}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            self.boundary,
            frame.data.len()
        );
        let mut buf = BytesMut::with_capacity(head.len() + frame.data.len() + 2);
        buf.put_slice(head.as_bytes());
        buf.put_slice(&frame.data);
        buf.put_slice(b"\r\n");
        buf.freeze()
    }

    fn check_size(&self, buffered: usize) -> Result<(), Error> {
        if buffered > self.max_frame {
            return Err(Error::FrameTooLarge {
                limit: self.max_frame,
            });
        }
        Ok(())
    }

    /// Search `src` for `needle`, resuming where the previous search stopped.
    fn search(&mut self, src: &[u8], needle: &[u8]) -> Option<usize> {
        let start = self.scanned.min(src.len());
        let found = find(&src[start..], needle).map(|i| i + start);
        self.scanned = match found {
            Some(_) => 0,
            None => src.len().saturating_sub(needle.len().saturating_sub(1)),
        };
        found
    }
}

/// Extract the boundary parameter from a multipart `Content-Type` value.
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.to_ascii_lowercase().starts_with("multipart/") {
        return None;
    }
    params.find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }
        let value = value.trim().trim_matches('"');
        (!value.is_empty()).then(|| value.to_owned())
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_headers(raw: &[u8]) -> (Option<String>, Option<usize>) {
    let text = String::from_utf8_lossy(raw);
    let mut content_type = None;
    let mut length = None;
    for line in text.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if name.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.trim().to_owned());
        } else if name.eq_ignore_ascii_case("content-length") {
            length = value.trim().parse().ok();
        }
    }
    (content_type, length)
}

impl Decoder for MjpegCodec {
    type Item = MjpegFrame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state.clone() {
                State::Delimiter => {
                    let delimiter = self.delimiter.clone();
                    let Some(at) = self.search(src, &delimiter) else {
                        // Nothing before a delimiter is worth keeping.
                        let keep = delimiter.len().saturating_sub(1).min(src.len());
                        let _ = src.split_to(src.len() - keep);
                        self.scanned = 0;
                        return Ok(None);
                    };
                    let after = at + delimiter.len();
                    if src.len() < after + 2 {
                        return Ok(None);
                    }
                    if &src[after..after + 2] == b"--" {
                        src.clear();
                        self.state = State::Closed;
                        return Ok(None);
                    }
                    let Some(eol) = find(&src[after..], b"\n") else {
                        self.check_size(src.len())?;
                        return Ok(None);
                    };
                    let _ = src.split_to(after + eol + 1);
                    self.state = State::Headers;
                }
                State::Headers => {
                    // A blank line straight after the delimiter is a part
                    // with no headers at all.
                    let end = if src.starts_with(b"\r\n") {
                        Some(2)
                    } else if src.starts_with(b"\n") {
                        Some(1)
                    } else if src[..] == *b"\r" {
                        None
                    } else {
                        find(src, b"\r\n\r\n")
                            .map(|i| i + 4)
                            .or_else(|| find(src, b"\n\n").map(|i| i + 2))
                    };
                    let Some(end) = end else {
                        self.check_size(src.len())?;
                        return Ok(None);
                    };
                    let raw = src.split_to(end);
                    let (content_type, length) = parse_headers(&raw);
                    if let Some(length) = length {
                        self.check_size(length)?;
                    }
                    self.state = State::Body {
                        content_type,
                        length,
                    };
                    self.scanned = 0;
                }
                State::Body {
                    content_type,
                    length: Some(length),
                } => {
                    if src.len() < length {
                        src.reserve(length - src.len());
                        return Ok(None);
                    }
                    let data = src.split_to(length).freeze();
                    self.state = State::Delimiter;
                    return Ok(Some(MjpegFrame { content_type, data }));
                }
                State::Body {
                    content_type,
                    length: None,
                } => {
                    let mut needle = Vec::with_capacity(self.delimiter.len() + 1);
                    needle.push(b'\n');
                    needle.extend_from_slice(&self.delimiter);
                    let Some(at) = self.search(src, &needle) else {
                        self.check_size(src.len())?;
                        return Ok(None);
                    };
                    let mut data = src.split_to(at + 1);
                    data.truncate(at);
                    if data.last() == Some(&b'\r') {
                        data.truncate(at - 1);
                    }
                    self.state = State::Delimiter;
                    return Ok(Some(MjpegFrame {
                        content_type,
                        data: data.freeze(),
                    }));
                }
                State::Closed => {
                    src.clear();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        match self.state.clone() {
            State::Delimiter | State::Closed => {
                src.clear();
                Ok(None)
            }
            State::Headers if src.iter().all(u8::is_ascii_whitespace) => {
                src.clear();
                Ok(None)
            }
            State::Body {
                content_type,
                length: None,
            } if !src.is_empty() => {
                // Upstream closed mid-part without a final delimiter.
                let mut data = src.split();
                while data.last().is_some_and(u8::is_ascii_whitespace) {
                    data.truncate(data.len() - 1);
                }
                self.state = State::Delimiter;
                Ok(Some(MjpegFrame {
                    content_type,
                    data: data.freeze(),
                }))
            }
            _ => Err(Error::Stream("upstream closed in the middle of a frame".into())),
        }
    }
}

impl Encoder<MjpegFrame> for MjpegCodec {
    type Error = Error;

    fn encode(&mut self, frame: MjpegFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&self.encode_part(&frame));
        Ok(())
    }
}
