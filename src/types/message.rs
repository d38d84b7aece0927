//! Conversation messages and their polymorphic content blocks.
//!
//! `ContentBlock` has a hand-written encoder: each tag emits exactly the keys the wire format
//! defines for it, optional keys only when set. Decoding goes through a private mirror enum
//! derived with serde and is then mapped back, so a text block carrying `cache_control`
//! decodes as a cache marker.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::types::media::{Citations, DocumentMediaType, DocumentSource, DocumentSourceType, ImageSource};
use crate::types::schema::CacheControl;

/// A single turn of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Content,
}

impl Message {
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<Content>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn with_content(role: Role, content: Content) -> Self {
        Self { role, content }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Message content: a bare string or an ordered list of blocks.
///
/// A bare string is sent as a JSON string, never wrapped in a one-element list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        Content::Blocks(blocks)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Vec<ContentBlock>> for Content {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Content::Blocks(blocks)
    }
}

/// One tagged unit of message content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
        cache_control: Option<CacheControl>,
    },
    Document(DocumentSource),
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        /// Opaque tool output.
        content: String,
        is_error: Option<bool>,
    },
    /// Text segment that ends a cacheable prompt prefix.
    CacheMarker {
        text: String,
        cache_control: CacheControl,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image(source: ImageSource) -> Self {
        ContentBlock::Image {
            source,
            cache_control: None,
        }
    }

    pub fn document(source: DocumentSource) -> Self {
        ContentBlock::Document(source)
    }

    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: None,
        }
    }

    /// Tool result flagged with `is_error: true`.
    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        ContentBlock::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: Some(true),
        }
    }

    pub fn cached_text(text: impl Into<String>) -> Self {
        ContentBlock::CacheMarker {
            text: text.into(),
            cache_control: CacheControl::ephemeral(),
        }
    }

    /// Wire tag of this block.
    pub fn kind(&self) -> &'static str {
        match self {
            ContentBlock::Text { .. } | ContentBlock::CacheMarker { .. } => "text",
            ContentBlock::Image { .. } => "image",
            ContentBlock::Document(_) => "document",
            ContentBlock::ToolUse { .. } => "tool_use",
            ContentBlock::ToolResult { .. } => "tool_result",
            ContentBlock::Thinking { .. } => "thinking",
            ContentBlock::RedactedThinking { .. } => "redacted_thinking",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } | ContentBlock::CacheMarker { text, .. } => Some(text),
            _ => None,
        }
    }
}

#[derive(Serialize)]
struct DocumentSourceRef<'a> {
    #[serde(rename = "type")]
    source_type: DocumentSourceType,
    media_type: DocumentMediaType,
    data: &'a str,
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", self.kind())?;
        match self {
            ContentBlock::Text { text } => {
                map.serialize_entry("text", text)?;
            }
            ContentBlock::Image {
                source,
                cache_control,
            } => {
                map.serialize_entry("source", source)?;
                if let Some(cc) = cache_control {
                    map.serialize_entry("cache_control", cc)?;
                }
            }
            ContentBlock::Document(doc) => {
                map.serialize_entry(
                    "source",
                    &DocumentSourceRef {
                        source_type: doc.media_type.source_type(),
                        media_type: doc.media_type,
                        data: &doc.data,
                    },
                )?;
                if let Some(title) = &doc.title {
                    map.serialize_entry("title", title)?;
                }
                if let Some(context) = &doc.context {
                    map.serialize_entry("context", context)?;
                }
                if let Some(citations) = &doc.citations {
                    map.serialize_entry("citations", citations)?;
                }
                if let Some(cc) = &doc.cache_control {
                    map.serialize_entry("cache_control", cc)?;
                }
            }
            ContentBlock::ToolUse { id, name, input } => {
                map.serialize_entry("id", id)?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("input", input)?;
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                map.serialize_entry("tool_use_id", tool_use_id)?;
                map.serialize_entry("content", content)?;
                if let Some(is_error) = is_error {
                    map.serialize_entry("is_error", is_error)?;
                }
            }
            ContentBlock::CacheMarker {
                text,
                cache_control,
            } => {
                map.serialize_entry("text", text)?;
                map.serialize_entry("cache_control", cache_control)?;
            }
            ContentBlock::Thinking {
                thinking,
                signature,
            } => {
                map.serialize_entry("thinking", thinking)?;
                if let Some(signature) = signature {
                    map.serialize_entry("signature", signature)?;
                }
            }
            ContentBlock::RedactedThinking { data } => {
                map.serialize_entry("data", data)?;
            }
        }
        map.end()
    }
}

#[derive(Deserialize)]
struct WireDocumentSource {
    #[serde(rename = "type")]
    source_type: DocumentSourceType,
    media_type: DocumentMediaType,
    data: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireContentBlock {
    Text {
        text: String,
        #[serde(default)]
        cache_control: Option<CacheControl>,
    },
    Image {
        source: ImageSource,
        #[serde(default)]
        cache_control: Option<CacheControl>,
    },
    Document {
        source: WireDocumentSource,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        context: Option<String>,
        #[serde(default)]
        citations: Option<Citations>,
        #[serde(default)]
        cache_control: Option<CacheControl>,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: String,
        #[serde(default)]
        is_error: Option<bool>,
    },
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    RedactedThinking {
        data: String,
    },
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let block = match WireContentBlock::deserialize(deserializer)? {
            WireContentBlock::Text {
                text,
                cache_control: Some(cache_control),
            } => ContentBlock::CacheMarker {
                text,
                cache_control,
            },
            WireContentBlock::Text { text, .. } => ContentBlock::Text { text },
            WireContentBlock::Image {
                source,
                cache_control,
            } => ContentBlock::Image {
                source,
                cache_control,
            },
            WireContentBlock::Document {
                source,
                title,
                context,
                citations,
                cache_control,
            } => {
                if source.media_type.source_type() != source.source_type {
                    return Err(D::Error::custom(format!(
                        "document source type {:?} does not match media type {}",
                        source.source_type,
                        source.media_type.as_str()
                    )));
                }
                ContentBlock::Document(DocumentSource {
                    media_type: source.media_type,
                    data: source.data,
                    title,
                    context,
                    citations,
                    cache_control,
                })
            }
            WireContentBlock::ToolUse { id, name, input } => {
                ContentBlock::ToolUse { id, name, input }
            }
            WireContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
            WireContentBlock::Thinking {
                thinking,
                signature,
            } => ContentBlock::Thinking {
                thinking,
                signature,
            },
            WireContentBlock::RedactedThinking { data } => ContentBlock::RedactedThinking { data },
        };
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::media::ImageMediaType;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_bare_string_content_is_not_wrapped() {
        let msg = Message::user("Hello, Claude");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({"role": "user", "content": "Hello, Claude"}));

        let decoded: Message = serde_json::from_value(value).unwrap();
        assert_eq!(decoded.content, Content::Text("Hello, Claude".into()));
    }

    #[test]
    fn test_block_content_round_trips() {
        let msg = Message::assistant(vec![
            ContentBlock::text("Let me check."),
            ContentBlock::tool_use("toolu_01", "get_weather", json!({"city": "Oslo"})),
        ]);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["content"][0], json!({"type": "text", "text": "Let me check."}));
        let decoded: Message = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_each_variant_emits_only_its_keys() {
        let image = ContentBlock::image(ImageSource::url("https://example.com/a.png"));
        assert_eq!(keys(&serde_json::to_value(&image).unwrap()), ["source", "type"]);

        let tool_use = ContentBlock::tool_use("toolu_01", "search", json!({}));
        assert_eq!(
            keys(&serde_json::to_value(&tool_use).unwrap()),
            ["id", "input", "name", "type"]
        );

        let result = ContentBlock::tool_result("toolu_01", "sunny");
        assert_eq!(
            keys(&serde_json::to_value(&result).unwrap()),
            ["content", "tool_use_id", "type"]
        );

        let thinking = ContentBlock::Thinking {
            thinking: "hmm".into(),
            signature: None,
        };
        assert_eq!(keys(&serde_json::to_value(&thinking).unwrap()), ["thinking", "type"]);

        let redacted = ContentBlock::RedactedThinking { data: "opaque".into() };
        assert_eq!(keys(&serde_json::to_value(&redacted).unwrap()), ["data", "type"]);
    }

    #[test]
    fn test_tool_result_is_error_only_when_set() {
        let ok = serde_json::to_value(ContentBlock::tool_result("toolu_01", "42")).unwrap();
        assert!(ok.get("is_error").is_none());

        let failed = serde_json::to_value(ContentBlock::tool_error("toolu_01", "timeout")).unwrap();
        assert_eq!(
            failed,
            json!({
                "type": "tool_result",
                "tool_use_id": "toolu_01",
                "content": "timeout",
                "is_error": true
            })
        );

        let explicit_false = ContentBlock::ToolResult {
            tool_use_id: "toolu_01".into(),
            content: "fine".into(),
            is_error: Some(false),
        };
        assert_eq!(serde_json::to_value(explicit_false).unwrap()["is_error"], false);
    }

    #[test]
    fn test_cache_marker_encodes_as_cached_text() {
        let block = ContentBlock::cached_text("<long shared context>");
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "text",
                "text": "<long shared context>",
                "cache_control": {"type": "ephemeral"}
            })
        );
        let decoded: ContentBlock = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, block);

        let plain: ContentBlock = serde_json::from_value(json!({"type": "text", "text": "hi"})).unwrap();
        assert_eq!(plain, ContentBlock::text("hi"));
    }

    #[test]
    fn test_document_splits_source_from_block_fields() {
        let doc = DocumentSource::pdf("JVBERi0xLjcK")
            .unwrap()
            .title("Q3 report")
            .context("Internal, not audited")
            .citations(true)
            .cache_control(CacheControl::ephemeral());
        let value = serde_json::to_value(ContentBlock::document(doc.clone())).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "document",
                "source": {
                    "type": "base64",
                    "media_type": "application/pdf",
                    "data": "JVBERi0xLjcK"
                },
                "title": "Q3 report",
                "context": "Internal, not audited",
                "citations": {"enabled": true},
                "cache_control": {"type": "ephemeral"}
            })
        );

        let decoded: ContentBlock = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, ContentBlock::Document(doc));
    }

    #[test]
    fn test_plain_text_document_omits_absent_fields() {
        let doc = DocumentSource::plain_text("Grass is green.").unwrap();
        let value = serde_json::to_value(ContentBlock::document(doc)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "document",
                "source": {"type": "text", "media_type": "text/plain", "data": "Grass is green."}
            })
        );
    }

    #[test]
    fn test_document_with_mismatched_source_type_is_rejected() {
        let value = json!({
            "type": "document",
            "source": {"type": "text", "media_type": "application/pdf", "data": "x"}
        });
        assert!(serde_json::from_value::<ContentBlock>(value).is_err());
    }

    #[test]
    fn test_image_with_cache_control() {
        let source = ImageSource::base64(ImageMediaType::Gif, "R0lGODlh").unwrap();
        let block = ContentBlock::Image {
            source,
            cache_control: Some(CacheControl::ephemeral()),
        };
        let value = serde_json::to_value(&block).unwrap();
        assert_eq!(value["cache_control"], json!({"type": "ephemeral"}));
        assert_eq!(value["source"]["media_type"], "image/gif");
    }

    #[test]
    fn test_unknown_block_type_fails() {
        let value = json!({"type": "hologram", "data": "?"});
        assert!(serde_json::from_value::<ContentBlock>(value).is_err());
    }
}
