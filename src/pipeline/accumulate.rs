//! Stream accumulator: folds [`StreamEvent`]s into a [`MessageResponse`].
//!
//! Lifecycle per message: `Idle --message_start--> Open --message_stop--> Closed`, with any
//! protocol violation moving to `Errored`. Each content block has its own
//! `Accumulating --content_block_stop--> Closed` lifecycle, keyed by its stream index.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, ErrorContext};
use crate::transport::classify::is_retryable_error_type;
use crate::types::events::{ContentDelta, DeltaUsage, MessageDeltaBody, StreamEvent};
use crate::types::message::ContentBlock;
use crate::types::response::MessageResponse;
use crate::PipeResult;

/// Message-level decoder state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// No `message_start` yet.
    Idle,
    /// Between `message_start` and `message_stop`.
    Open,
    /// `message_stop` received; the message is final.
    Closed,
    /// A protocol violation or in-stream error was seen; no further events are accepted.
    Errored,
}

/// Per-block state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Accumulating,
    Closed,
}

#[derive(Debug, Clone)]
enum PartialBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
        partial_json: String,
    },
}

impl PartialBlock {
    fn open(index: usize, block: &ContentBlock) -> PipeResult<Self> {
        Ok(match block {
            ContentBlock::Text { text } => PartialBlock::Text { text: text.clone() },
            ContentBlock::Thinking {
                thinking,
                signature,
            } => PartialBlock::Thinking {
                thinking: thinking.clone(),
                signature: signature.clone(),
            },
            ContentBlock::RedactedThinking { data } => {
                PartialBlock::RedactedThinking { data: data.clone() }
            }
            ContentBlock::ToolUse { id, name, input } => PartialBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
                partial_json: String::new(),
            },
            other => {
                return Err(protocol_error(
                    format!("block type {:?} cannot be streamed", other.kind()),
                    index,
                ))
            }
        })
    }

    fn kind(&self) -> &'static str {
        match self {
            PartialBlock::Text { .. } => "text",
            PartialBlock::Thinking { .. } => "thinking",
            PartialBlock::RedactedThinking { .. } => "redacted_thinking",
            PartialBlock::ToolUse { .. } => "tool_use",
        }
    }

    fn apply(&mut self, index: usize, delta: &ContentDelta) -> PipeResult<()> {
        match (self, delta) {
            (PartialBlock::Text { text }, ContentDelta::TextDelta { text: fragment }) => {
                text.push_str(fragment);
            }
            // Citations are surfaced as raw events only
            (PartialBlock::Text { .. }, ContentDelta::CitationsDelta { .. }) => {}
            (PartialBlock::Thinking { thinking, .. }, ContentDelta::ThinkingDelta { thinking: t }) => {
                thinking.push_str(t);
            }
            (PartialBlock::Thinking { signature, .. }, ContentDelta::SignatureDelta { signature: s }) => {
                signature.get_or_insert_with(String::new).push_str(s);
            }
            (
                PartialBlock::ToolUse { partial_json, .. },
                ContentDelta::InputJsonDelta { partial_json: fragment },
            ) => {
                partial_json.push_str(fragment);
            }
            (block, delta) => {
                return Err(protocol_error(
                    format!(
                        "{} cannot be applied to a {} block",
                        delta.kind(),
                        block.kind()
                    ),
                    index,
                ))
            }
        }
        Ok(())
    }

    /// Finalize on `content_block_stop`. Tool input is parsed here and nowhere earlier.
    fn close(&mut self, index: usize) -> PipeResult<()> {
        if let PartialBlock::ToolUse {
            input,
            partial_json,
            ..
        } = self
        {
            if !partial_json.trim().is_empty() {
                *input = serde_json::from_str(partial_json).map_err(|e| {
                    Error::decode(
                        format!("tool input for block {} is not valid JSON: {}", index, e),
                        ErrorContext::new()
                            .with_field_path(format!("content[{}].input", index))
                            .with_source("stream_accumulator"),
                    )
                })?;
            }
        }
        Ok(())
    }

    fn to_content_block(&self) -> ContentBlock {
        match self {
            PartialBlock::Text { text } => ContentBlock::Text { text: text.clone() },
            PartialBlock::Thinking {
                thinking,
                signature,
            } => ContentBlock::Thinking {
                thinking: thinking.clone(),
                signature: signature.clone(),
            },
            PartialBlock::RedactedThinking { data } => {
                ContentBlock::RedactedThinking { data: data.clone() }
            }
            PartialBlock::ToolUse {
                id, name, input, ..
            } => ContentBlock::ToolUse {
                id: id.clone(),
                name: name.clone(),
                input: input.clone(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct BlockSlot {
    state: BlockState,
    block: PartialBlock,
}

/// Incremental state machine assembling one streamed message.
#[derive(Debug, Clone)]
pub struct MessageAccumulator {
    state: DecoderState,
    message: Option<MessageResponse>,
    blocks: BTreeMap<usize, BlockSlot>,
}

impl Default for MessageAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageAccumulator {
    pub fn new() -> Self {
        Self {
            state: DecoderState::Idle,
            message: None,
            blocks: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// True once `message_stop` has been applied.
    pub fn is_complete(&self) -> bool {
        self.state == DecoderState::Closed
    }

    /// State of the block at `index`, if it was opened.
    pub fn block_state(&self, index: usize) -> Option<BlockState> {
        self.blocks.get(&index).map(|slot| slot.state)
    }

    /// Apply one event. On error the accumulator moves to [`DecoderState::Errored`] and
    /// rejects everything after.
    pub fn apply(&mut self, event: &StreamEvent) -> PipeResult<()> {
        match self.state {
            DecoderState::Errored => {
                return Err(Error::decode(
                    "stream already failed",
                    ErrorContext::new().with_source("stream_accumulator"),
                ))
            }
            DecoderState::Closed => {
                return Err(Error::decode(
                    format!("{} received after message_stop", event.name()),
                    ErrorContext::new().with_source("stream_accumulator"),
                ))
            }
            _ => {}
        }

        let result = self.transition(event);
        if result.is_err() {
            self.state = DecoderState::Errored;
        }
        result
    }

    /// Mark the stream as failed from outside (e.g. the transport broke mid-body).
    pub fn fail(&mut self) {
        self.state = DecoderState::Errored;
    }

    fn transition(&mut self, event: &StreamEvent) -> PipeResult<()> {
        match event {
            StreamEvent::Ping => Ok(()),
            StreamEvent::Error { error } => Err(Error::Api {
                status: None,
                error_type: error.error_type.clone(),
                message: error.message.clone(),
                retryable: is_retryable_error_type(&error.error_type),
                retry_after_ms: None,
            }),
            StreamEvent::MessageStart { message } => {
                if self.state != DecoderState::Idle {
                    return Err(Error::decode(
                        "duplicate message_start",
                        ErrorContext::new().with_source("stream_accumulator"),
                    ));
                }
                let mut skeleton = message.clone();
                for (index, block) in std::mem::take(&mut skeleton.content).iter().enumerate() {
                    let mut partial = PartialBlock::open(index, block)?;
                    partial.close(index)?;
                    self.blocks.insert(
                        index,
                        BlockSlot {
                            state: BlockState::Closed,
                            block: partial,
                        },
                    );
                }
                debug!(message_id = %skeleton.id, model = %skeleton.model, "message started");
                self.message = Some(skeleton);
                self.state = DecoderState::Open;
                Ok(())
            }
            _ if self.state == DecoderState::Idle => Err(Error::decode(
                format!("{} received before message_start", event.name()),
                ErrorContext::new().with_source("stream_accumulator"),
            )),
            StreamEvent::ContentBlockStart {
                index,
                content_block,
            } => {
                if self.blocks.contains_key(index) {
                    return Err(protocol_error(
                        format!("block {} opened twice", index),
                        *index,
                    ));
                }
                let block = PartialBlock::open(*index, content_block)?;
                debug!(index = *index, kind = block.kind(), "content block opened");
                self.blocks.insert(
                    *index,
                    BlockSlot {
                        state: BlockState::Accumulating,
                        block,
                    },
                );
                Ok(())
            }
            StreamEvent::ContentBlockDelta { index, delta } => {
                let slot = self.slot_mut(*index, delta.kind())?;
                slot.block.apply(*index, delta)
            }
            StreamEvent::ContentBlockStop { index } => {
                let slot = self.slot_mut(*index, "content_block_stop")?;
                slot.block.close(*index)?;
                slot.state = BlockState::Closed;
                debug!(index = *index, kind = slot.block.kind(), "content block closed");
                Ok(())
            }
            StreamEvent::MessageDelta { delta, usage } => {
                self.apply_message_delta(delta, usage);
                Ok(())
            }
            StreamEvent::MessageStop => {
                if let Some((index, _)) = self
                    .blocks
                    .iter()
                    .find(|(_, slot)| slot.state == BlockState::Accumulating)
                {
                    return Err(protocol_error(
                        format!("message_stop while block {} is still open", index),
                        *index,
                    ));
                }
                debug!(blocks = self.blocks.len(), "message stopped");
                self.state = DecoderState::Closed;
                Ok(())
            }
        }
    }

    fn slot_mut(&mut self, index: usize, what: &str) -> PipeResult<&mut BlockSlot> {
        match self.blocks.get_mut(&index) {
            None => Err(protocol_error(
                format!("{} for block {} which was never opened", what, index),
                index,
            )),
            Some(slot) if slot.state == BlockState::Closed => Err(protocol_error(
                format!("{} for block {} after content_block_stop", what, index),
                index,
            )),
            Some(slot) => Ok(slot),
        }
    }

    fn apply_message_delta(&mut self, delta: &MessageDeltaBody, usage: &DeltaUsage) {
        let Some(message) = self.message.as_mut() else {
            return;
        };
        if delta.stop_reason.is_some() {
            message.stop_reason = delta.stop_reason;
        }
        if delta.stop_sequence.is_some() {
            message.stop_sequence = delta.stop_sequence.clone();
        }
        if let Some(n) = usage.input_tokens {
            message.usage.input_tokens = n;
        }
        if let Some(n) = usage.output_tokens {
            message.usage.output_tokens = n;
        }
        if usage.cache_creation_input_tokens.is_some() {
            message.usage.cache_creation_input_tokens = usage.cache_creation_input_tokens;
        }
        if usage.cache_read_input_tokens.is_some() {
            message.usage.cache_read_input_tokens = usage.cache_read_input_tokens;
        }
    }

    fn build(&self) -> Option<MessageResponse> {
        let mut message = self.message.clone()?;
        message.content = self
            .blocks
            .values()
            .map(|slot| slot.block.to_content_block())
            .collect();
        Some(message)
    }

    /// Best-effort view of the message so far. Open tool-use blocks carry their start input;
    /// their partial JSON is not parsed until the block closes.
    pub fn snapshot(&self) -> Option<MessageResponse> {
        self.build()
    }

    /// The final message. Only succeeds once `message_stop` was applied.
    pub fn into_message(self) -> PipeResult<MessageResponse> {
        match self.state {
            DecoderState::Closed => self.build().ok_or_else(|| {
                Error::decode(
                    "closed stream has no message",
                    ErrorContext::new().with_source("stream_accumulator"),
                )
            }),
            DecoderState::Errored => Err(Error::decode(
                "stream failed before the message was complete",
                ErrorContext::new().with_source("stream_accumulator"),
            )),
            DecoderState::Idle => Err(Error::incomplete("stream ended before message_start")),
            DecoderState::Open => Err(Error::incomplete(format!(
                "stream ended before message_stop ({} blocks received)",
                self.blocks.len()
            ))),
        }
    }
}

fn protocol_error(message: String, index: usize) -> Error {
    Error::decode(
        message,
        ErrorContext::new()
            .with_field_path(format!("index {}", index))
            .with_source("stream_accumulator"),
    )
}
