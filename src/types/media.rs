//! Image and document sources.
//!
//! Both are built through fallible constructors that validate the payload before any request
//! is encoded: base64 must decode, and the decoded size must stay under the per-media-type
//! ceiling.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorContext};
use crate::types::schema::CacheControl;

/// Decoded-size ceiling for PDF and plain-text documents.
pub const MAX_DOCUMENT_BYTES: usize = 32_000_000;

/// Decoded-size ceiling for base64 images.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    pub fn max_bytes(&self) -> usize {
        MAX_IMAGE_BYTES
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ImageSourceKind {
    Base64 {
        media_type: ImageMediaType,
        data: String,
    },
    Url {
        url: String,
    },
}

/// Source of an image content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageSource(ImageSourceKind);

impl ImageSource {
    /// Inline base64 image. Fails if `data` is not valid base64 or decodes past the ceiling.
    pub fn base64(media_type: ImageMediaType, data: impl Into<String>) -> crate::Result<Self> {
        let data = data.into();
        validate_base64(&data, media_type.as_str(), media_type.max_bytes(), "image_source")?;
        Ok(Self(ImageSourceKind::Base64 { media_type, data }))
    }

    /// Encode raw image bytes as base64.
    pub fn from_bytes(media_type: ImageMediaType, bytes: &[u8]) -> crate::Result<Self> {
        check_size(bytes.len(), media_type.as_str(), media_type.max_bytes(), "image_source")?;
        let data = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self(ImageSourceKind::Base64 { media_type, data }))
    }

    /// Image referenced by URL; fetched by the service.
    pub fn url(url: impl Into<String>) -> Self {
        Self(ImageSourceKind::Url { url: url.into() })
    }

    pub fn media_type(&self) -> Option<ImageMediaType> {
        match &self.0 {
            ImageSourceKind::Base64 { media_type, .. } => Some(*media_type),
            ImageSourceKind::Url { .. } => None,
        }
    }

    pub fn data(&self) -> Option<&str> {
        match &self.0 {
            ImageSourceKind::Base64 { data, .. } => Some(data),
            ImageSourceKind::Url { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentMediaType {
    #[serde(rename = "application/pdf")]
    Pdf,
    #[serde(rename = "text/plain")]
    PlainText,
}

impl DocumentMediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PlainText => "text/plain",
        }
    }

    /// Value of the wire `source.type` key for this media type.
    pub fn source_type(&self) -> DocumentSourceType {
        match self {
            Self::Pdf => DocumentSourceType::Base64,
            Self::PlainText => DocumentSourceType::Text,
        }
    }

    pub fn max_bytes(&self) -> usize {
        MAX_DOCUMENT_BYTES
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSourceType {
    Base64,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citations {
    pub enabled: bool,
}

/// A document attached to a user turn.
///
/// Held as one flat value; [`crate::types::ContentBlock`] splits it on the wire into a nested
/// `source` object (`type`, `media_type`, `data`) and block-level `title`, `context`,
/// `citations` and `cache_control` keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub(crate) media_type: DocumentMediaType,
    pub(crate) data: String,
    pub(crate) title: Option<String>,
    pub(crate) context: Option<String>,
    pub(crate) citations: Option<Citations>,
    pub(crate) cache_control: Option<CacheControl>,
}

impl DocumentSource {
    /// Base64-encoded PDF.
    pub fn pdf(data: impl Into<String>) -> crate::Result<Self> {
        Self::new(DocumentMediaType::Pdf, data.into())
    }

    /// Plain text, sent verbatim (no base64 step).
    pub fn plain_text(text: impl Into<String>) -> crate::Result<Self> {
        Self::new(DocumentMediaType::PlainText, text.into())
    }

    pub fn new(media_type: DocumentMediaType, data: String) -> crate::Result<Self> {
        match media_type.source_type() {
            DocumentSourceType::Base64 => validate_base64(
                &data,
                media_type.as_str(),
                media_type.max_bytes(),
                "document_source",
            )?,
            DocumentSourceType::Text => check_size(
                data.len(),
                media_type.as_str(),
                media_type.max_bytes(),
                "document_source",
            )?,
        }
        Ok(Self {
            media_type,
            data,
            title: None,
            context: None,
            citations: None,
            cache_control: None,
        })
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn citations(mut self, enabled: bool) -> Self {
        self.citations = Some(Citations { enabled });
        self
    }

    pub fn cache_control(mut self, cache_control: CacheControl) -> Self {
        self.cache_control = Some(cache_control);
        self
    }

    pub fn media_type(&self) -> DocumentMediaType {
        self.media_type
    }

    pub fn data(&self) -> &str {
        &self.data
    }
}

fn validate_base64(data: &str, media_type: &str, max_bytes: usize, source: &str) -> crate::Result<()> {
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| {
            Error::invalid_input(
                format!("{} payload is not valid base64: {}", media_type, e),
                ErrorContext::new()
                    .with_field_path("source.data")
                    .with_source(source),
            )
        })?;
    check_size(decoded.len(), media_type, max_bytes, source)
}

fn check_size(len: usize, media_type: &str, max_bytes: usize, source: &str) -> crate::Result<()> {
    if len > max_bytes {
        return Err(Error::invalid_input(
            format!(
                "{} payload is {} bytes, above the {} byte limit",
                media_type, len, max_bytes
            ),
            ErrorContext::new()
                .with_field_path("source.data")
                .with_details(format!("size={len}, limit={max_bytes}"))
                .with_source(source),
        ));
    }
    Ok(())
}
