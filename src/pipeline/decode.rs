//! Streaming decoder (Bytes -> SSE frames -> StreamEvent)
//!
//! Frames are delimited by a blank line (`\n\n` or `\r\n\r\n`). Bytes are buffered until a full
//! frame is present and only then UTF-8 decoded, so chunk boundaries may fall anywhere,
//! including inside a multi-byte code point.

use crate::error::{Error, ErrorContext};
use crate::types::events::StreamEvent;
use crate::{BoxStream, PipeResult};
use bytes::Bytes;
use futures::{stream, StreamExt};

/// Maximum size for the frame buffer before the stream is aborted.
pub const MAX_SSE_BUFFER: usize = 16 * 1024 * 1024; // 16 MiB

/// One server-sent event: optional `event:` name and the joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE frame splitter.
///
/// `pos` marks the start of unconsumed bytes and `scan` the offset from which the next
/// delimiter search resumes. Consumed bytes are compacted away on the next `push`.
#[derive(Debug, Default)]
pub struct SseFramer {
    buf: Vec<u8>,
    pos: usize,
    scan: usize,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a network chunk.
    ///
    /// Fails when the bytes after the last frame delimiter exceed [`MAX_SSE_BUFFER`].
    pub fn push(&mut self, chunk: &[u8]) -> PipeResult<()> {
        if self.pos > 0 {
            self.buf.drain(..self.pos);
            self.scan -= self.pos;
            self.pos = 0;
        }
        self.buf.extend_from_slice(chunk);

        if self.buf.len() > MAX_SSE_BUFFER {
            let tail = match last_frame_end(&self.buf[self.scan..]) {
                Some(end) => self.buf.len() - (self.scan + end),
                None => self.buf.len(),
            };
            if tail > MAX_SSE_BUFFER {
                self.reset();
                return Err(Error::decode(
                    "SSE frame buffer exceeded 16 MiB without a frame delimiter",
                    ErrorContext::new().with_source("sse_decoder"),
                ));
            }
        }
        Ok(())
    }

    /// Pop the next complete frame, skipping comment-only and data-less frames.
    pub fn next_frame(&mut self) -> PipeResult<Option<SseFrame>> {
        loop {
            let from = self.scan.max(self.pos);
            let Some((offset, delimiter_len)) = find_frame_end(&self.buf[from..]) else {
                // A delimiter may still start in the last three bytes
                self.scan = self.buf.len().saturating_sub(3).max(self.pos);
                return Ok(None);
            };
            let start = self.pos;
            let end = from + offset;
            self.pos = end + delimiter_len;
            self.scan = self.pos;
            if let Some(frame) = parse_frame(frame_text(&self.buf[start..end])?) {
                return Ok(Some(frame));
            }
        }
    }

    /// Flush a trailing frame that was not followed by a blank line.
    pub fn finish(&mut self) -> PipeResult<Option<SseFrame>> {
        if let Some(frame) = self.next_frame()? {
            return Ok(Some(frame));
        }
        let raw = self.buf.split_off(self.pos);
        self.reset();
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(parse_frame(frame_text(&raw)?))
    }

    fn reset(&mut self) {
        self.buf.clear();
        self.pos = 0;
        self.scan = 0;
    }
}

fn frame_text(raw: &[u8]) -> PipeResult<&str> {
    std::str::from_utf8(raw).map_err(|e| {
        Error::decode(
            format!("SSE frame is not valid UTF-8: {}", e),
            ErrorContext::new().with_source("sse_decoder"),
        )
    })
}

fn find_frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|i| (i, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| (i, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// End offset (past the delimiter) of the last complete frame in `buf`.
fn last_frame_end(buf: &[u8]) -> Option<usize> {
    let lf = buf.windows(2).rposition(|w| w == b"\n\n").map(|i| i + 2);
    let crlf = buf.windows(4).rposition(|w| w == b"\r\n\r\n").map(|i| i + 4);
    lf.max(crlf)
}

fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();

    for line in text.lines() {
        // Ignore blank and comment lines
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data.push(value),
            // id / retry carry nothing the decoder needs
            _ => {}
        }
    }

    if data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

/// Decode one frame into a typed event, checking the `event:` name when present.
pub fn frame_to_event(frame: &SseFrame) -> PipeResult<StreamEvent> {
    let event = StreamEvent::parse(&frame.data)?;
    if let Some(name) = frame.event.as_deref() {
        if name != event.name() {
            return Err(Error::decode(
                format!(
                    "SSE event name {:?} does not match payload type {:?}",
                    name,
                    event.name()
                ),
                ErrorContext::new().with_source("sse_decoder"),
            ));
        }
    }
    Ok(event)
}

/// Turn a byte stream into a stream of typed events.
///
/// The returned stream ends right after the first error.
pub fn decode_events(input: BoxStream<'static, Bytes>) -> BoxStream<'static, StreamEvent> {
    let stream = stream::unfold(
        (input, SseFramer::new(), false),
        |(mut input, mut framer, done)| async move {
            if done {
                return None;
            }
            loop {
                match framer.next_frame() {
                    Ok(Some(frame)) => {
                        let item = frame_to_event(&frame);
                        let failed = item.is_err();
                        return Some((item, (input, framer, failed)));
                    }
                    Ok(None) => {}
                    Err(e) => return Some((Err(e), (input, framer, true))),
                }

                // Need more data.
                match input.next().await {
                    Some(Ok(bytes)) => {
                        if let Err(e) = framer.push(&bytes) {
                            return Some((Err(e), (input, framer, true)));
                        }
                    }
                    Some(Err(e)) => return Some((Err(e), (input, framer, true))),
                    None => {
                        // EOF: try the remaining buffer once
                        return match framer.finish() {
                            Ok(Some(frame)) => {
                                Some((frame_to_event(&frame), (input, framer, true)))
                            }
                            Ok(None) => None,
                            Err(e) => Some((Err(e), (input, framer, true))),
                        };
                    }
                }
            }
        },
    );

    Box::pin(stream)
}
