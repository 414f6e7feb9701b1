//! Frame Types
//!
//! The input shapes a detection frame arrives in and the normalized frame
//! the decoder produces. Shape sniffing happens here, once, at the
//! boundary; the decoder only matches on [`FramePayload`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::constants::{
    BYTEA_HEX_MARKER, DATA_URL_BASE64_SUFFIX, DATA_URL_IMAGE_PREFIX, DATA_URL_SCHEME, HEX_MARKER,
    JPEG_DATA_URL_PREFIX, JPEG_MAGIC, JPEG_MIME, PLACEHOLDER_JPEG, TAGGED_BUFFER_TYPE,
};
use crate::error::FrameError;

// ============================================================================
// ENCODING TAG
// ============================================================================

/// Which input shape a frame was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameEncoding {
    Binary,
    TaggedBuffer,
    HexEscaped,
    DataUrl,
    Base64,
}

impl FrameEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameEncoding::Binary => "binary",
            FrameEncoding::TaggedBuffer => "tagged_buffer",
            FrameEncoding::HexEscaped => "hex_escaped",
            FrameEncoding::DataUrl => "data_url",
            FrameEncoding::Base64 => "base64",
        }
    }
}

impl std::fmt::Display for FrameEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// INPUT PAYLOAD
// ============================================================================

/// A frame value of known shape, not yet decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    /// Raw bytes, e.g. a `BYTEA` column holding a real JPEG
    Binary(Vec<u8>),
    /// `{ "type": "Buffer", "data": [...] }`, already unpacked
    TaggedBuffer(Vec<u8>),
    /// Hex digits with the `\x` / `x` marker stripped
    HexEscaped(String),
    /// Full `data:image/...;base64,` string
    DataUrl(String),
    /// Bare base64 body
    Base64(String),
}

/// Serialized Node buffer
#[derive(Debug, Deserialize)]
struct TaggedBuffer {
    #[serde(rename = "type")]
    kind: String,
    data: Vec<u8>,
}

impl FramePayload {
    pub fn encoding(&self) -> FrameEncoding {
        match self {
            FramePayload::Binary(_) => FrameEncoding::Binary,
            FramePayload::TaggedBuffer(_) => FrameEncoding::TaggedBuffer,
            FramePayload::HexEscaped(_) => FrameEncoding::HexEscaped,
            FramePayload::DataUrl(_) => FrameEncoding::DataUrl,
            FramePayload::Base64(_) => FrameEncoding::Base64,
        }
    }

    /// Resolve a JSON request field
    pub fn from_json(value: &Value) -> Result<Self, FrameError> {
        match value {
            Value::String(text) => Self::from_text(text),
            Value::Object(_) => {
                let buffer: TaggedBuffer = serde_json::from_value(value.clone())
                    .map_err(|e| FrameError::unsupported(format!("malformed buffer object: {}", e)))?;
                buffer.into_bytes().map(FramePayload::TaggedBuffer)
            }
            Value::Null => Err(FrameError::EmptyPayload),
            Value::Bool(_) => Err(FrameError::unsupported("boolean frame value")),
            Value::Number(_) => Err(FrameError::unsupported("numeric frame value")),
            Value::Array(_) => Err(FrameError::unsupported("bare array frame value")),
        }
    }

    /// Resolve a string from a request body or a text column
    pub fn from_text(text: &str) -> Result<Self, FrameError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FrameError::EmptyPayload);
        }

        // `\x` cannot start a base64 body, so it always means hex
        if let Some(body) = text.strip_prefix(BYTEA_HEX_MARKER) {
            return Ok(FramePayload::HexEscaped(body.to_string()));
        }

        // `x` can: only treat it as hex if the rest really is hex
        if let Some(body) = text.strip_prefix(HEX_MARKER) {
            if is_hex_body(body) {
                return Ok(FramePayload::HexEscaped(body.to_string()));
            }
        }

        if text.starts_with('{') {
            let buffer: TaggedBuffer = serde_json::from_str(text)
                .map_err(|e| FrameError::unsupported(format!("malformed buffer JSON: {}", e)))?;
            return buffer.into_bytes().map(FramePayload::TaggedBuffer);
        }

        if text.starts_with(DATA_URL_SCHEME) {
            split_data_url(text)?;
            return Ok(FramePayload::DataUrl(text.to_string()));
        }

        Ok(FramePayload::Base64(text.to_string()))
    }

    /// Resolve the contents of a binary column.
    ///
    /// Older rows stored base64 text or buffer JSON into the binary column,
    /// so text-shaped bytes are reinterpreted; anything else stays binary.
    pub fn from_stored_bytes(bytes: Vec<u8>) -> Result<Self, FrameError> {
        if bytes.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        if bytes.starts_with(&JPEG_MAGIC) {
            return Ok(FramePayload::Binary(bytes));
        }

        let reinterpreted = std::str::from_utf8(&bytes)
            .ok()
            .and_then(|text| FramePayload::from_text(text).ok())
            .filter(|payload| match payload {
                FramePayload::Base64(body) => looks_like_base64(body),
                _ => true,
            });

        Ok(reinterpreted.unwrap_or(FramePayload::Binary(bytes)))
    }
}

impl TaggedBuffer {
    fn into_bytes(self) -> Result<Vec<u8>, FrameError> {
        if self.kind != TAGGED_BUFFER_TYPE {
            return Err(FrameError::unsupported(format!(
                "buffer object has type '{}', expected '{}'",
                self.kind, TAGGED_BUFFER_TYPE
            )));
        }
        if self.data.is_empty() {
            return Err(FrameError::EmptyPayload);
        }
        Ok(self.data)
    }
}

/// Split a data-URL into its base64 body, checking the header
pub(crate) fn split_data_url(url: &str) -> Result<&str, FrameError> {
    let rest = url
        .strip_prefix(DATA_URL_SCHEME)
        .ok_or_else(|| FrameError::unsupported("missing data: scheme"))?;
    let (header, body) = rest
        .split_once(',')
        .ok_or_else(|| FrameError::unsupported("data URL has no ',' separator"))?;

    if !header.starts_with(DATA_URL_IMAGE_PREFIX) || !header.ends_with(DATA_URL_BASE64_SUFFIX) {
        return Err(FrameError::unsupported(format!(
            "data URL header '{}' is not an image/*;base64 header",
            header
        )));
    }

    Ok(body)
}

fn is_hex_body(body: &str) -> bool {
    !body.is_empty() && body.len() % 2 == 0 && body.bytes().all(|b| b.is_ascii_hexdigit())
}

fn looks_like_base64(body: &str) -> bool {
    body.len() >= 4
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b.is_ascii_whitespace() || matches!(b, b'+' | b'/' | b'='))
}

// ============================================================================
// NORMALIZED FRAME
// ============================================================================

/// A decoded JPEG, ready to serve as bytes or as a data-URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
    base64_body: String,
    /// Set when the input was a data-URL; its header is served back as-is
    data_url_prefix: Option<String>,
    encoding: FrameEncoding,
    placeholder: bool,
}

impl Frame {
    /// Wrap a byte buffer for transport
    pub fn from_jpeg_bytes(bytes: Vec<u8>) -> Self {
        let base64_body = BASE64.encode(&bytes);
        Self {
            bytes,
            base64_body,
            data_url_prefix: None,
            encoding: FrameEncoding::Binary,
            placeholder: false,
        }
    }

    pub(crate) fn decoded(
        bytes: Vec<u8>,
        base64_body: Option<String>,
        data_url_prefix: Option<String>,
        encoding: FrameEncoding,
    ) -> Self {
        let base64_body = base64_body.unwrap_or_else(|| BASE64.encode(&bytes));
        Self {
            bytes,
            base64_body,
            data_url_prefix,
            encoding,
            placeholder: false,
        }
    }

    /// The fixed placeholder, tagged with the encoding that failed
    pub fn placeholder(encoding: FrameEncoding) -> Self {
        Self {
            bytes: PLACEHOLDER_JPEG.to_vec(),
            base64_body: BASE64.encode(PLACEHOLDER_JPEG),
            data_url_prefix: None,
            encoding,
            placeholder: true,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn base64_body(&self) -> &str {
        &self.base64_body
    }

    pub fn to_data_url(&self) -> String {
        let prefix = self.data_url_prefix.as_deref().unwrap_or(JPEG_DATA_URL_PREFIX);
        format!("{}{}", prefix, self.base64_body)
    }

    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME
    }

    pub fn encoding(&self) -> FrameEncoding {
        self.encoding
    }

    /// True when the source was corrupt and this is the placeholder image
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}
