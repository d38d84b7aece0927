//! 流式处理模块：将 SSE 字节流解码为事件并累积为完整消息。
//!
//! # Streaming Pipeline
//!
//! Turns the raw body of a streaming Messages API response into typed events and, in the same
//! pass, into the final [`MessageResponse`].
//!
//! ```text
//! Bytes ──decode──▶ SseFrame ──parse──▶ StreamEvent ──accumulate──▶ MessageResponse
//! ```
//!
//! | Stage | Module | Responsibility |
//! |-------|--------|----------------|
//! | Framing | [`decode`] | Split on blank lines, join `data:` lines, UTF-8 per frame, 16 MiB cap |
//! | Parsing | [`decode`] | Typed [`StreamEvent`]s; unknown types are decode errors |
//! | Accumulation | [`accumulate`] | Per-block state machine, tool JSON parsed on block stop |
//!
//! [`MessageStream`] ties the stages together. It yields every event in order and ends after
//! `message_stop` or the first error; a body that ends early yields [`Error::Incomplete`].

pub mod accumulate;
pub mod decode;

pub use accumulate::{BlockState, DecoderState, MessageAccumulator};
pub use decode::{decode_events, SseFrame, SseFramer, MAX_SSE_BUFFER};

use crate::error::Error;
use crate::types::events::{ContentDelta, StreamEvent};
use crate::types::response::MessageResponse;
use crate::{BoxStream, PipeResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::debug;

/// Typed event stream of one streamed message.
///
/// Events pass through unchanged; the stream keeps its own [`MessageAccumulator`] so the final
/// message is available via [`MessageStream::final_message`] without a second pass.
pub struct MessageStream {
    events: BoxStream<'static, StreamEvent>,
    accumulator: MessageAccumulator,
    finished: bool,
}

impl MessageStream {
    /// Build from a raw SSE body.
    pub fn from_bytes(body: BoxStream<'static, Bytes>) -> Self {
        Self::from_events(decode_events(body))
    }

    /// Build from already-decoded events.
    pub fn from_events(events: BoxStream<'static, StreamEvent>) -> Self {
        Self {
            events,
            accumulator: MessageAccumulator::new(),
            finished: false,
        }
    }

    pub fn state(&self) -> DecoderState {
        self.accumulator.state()
    }

    /// The message as received so far, or `None` before `message_start`.
    pub fn snapshot(&self) -> Option<MessageResponse> {
        self.accumulator.snapshot()
    }

    /// Drain the remaining events and return the assembled message.
    ///
    /// Fails with the first stream error, or with [`Error::Incomplete`] when the body ended
    /// before `message_stop`.
    pub async fn final_message(mut self) -> PipeResult<MessageResponse> {
        while let Some(item) = self.next().await {
            item?;
        }
        self.accumulator.into_message()
    }

    /// Only the text fragments, in arrival order.
    pub fn text_stream(self) -> impl Stream<Item = PipeResult<String>> + Send {
        self.filter_map(|item| async move {
            match item {
                Ok(StreamEvent::ContentBlockDelta {
                    delta: ContentDelta::TextDelta { text },
                    ..
                }) => Some(Ok(text)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        })
    }
}

impl Stream for MessageStream {
    type Item = PipeResult<StreamEvent>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.events.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(event))) => match this.accumulator.apply(&event) {
                Ok(()) => {
                    if this.accumulator.is_complete() {
                        this.finished = true;
                    }
                    Poll::Ready(Some(Ok(event)))
                }
                Err(e) => {
                    debug!(event = event.name(), error = %e, "stream rejected event");
                    this.finished = true;
                    Poll::Ready(Some(Err(e)))
                }
            },
            Poll::Ready(Some(Err(e))) => {
                debug!(error = %e, "stream failed");
                this.accumulator.fail();
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                if this.accumulator.is_complete() {
                    return Poll::Ready(None);
                }
                let err = match this.accumulator.state() {
                    DecoderState::Idle => Error::incomplete("stream ended before message_start"),
                    _ => Error::incomplete("stream ended before message_stop"),
                };
                Poll::Ready(Some(Err(err)))
            }
        }
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream")
            .field("state", &self.accumulator.state())
            .field("finished", &self.finished)
            .finish()
    }
}
