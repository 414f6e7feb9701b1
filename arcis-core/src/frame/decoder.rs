//! Frame Decoder
//!
//! Turns a [`FramePayload`] into a normalized JPEG [`Frame`].
//!
//! Precedence follows the payload variants: binary passthrough, tagged
//! buffer, hex escape (decoded, then read once more as buffer JSON, data-URL
//! or base64), data-URL, bare base64. Every path ends in the same check for
//! the JPEG SOI marker.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};

use super::constants::JPEG_MAGIC;
use super::types::{split_data_url, Frame, FramePayload};
use crate::error::FrameError;

/// Standard alphabet; accepts bodies with or without padding
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Bytes plus the text they came from, when there was one
struct Resolved {
    bytes: Vec<u8>,
    base64_body: Option<String>,
    /// `data:image/...;base64,` header exactly as received
    data_url_prefix: Option<String>,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Decode a frame, substituting the placeholder for corrupt images.
///
/// Only `UnsupportedEncoding` and `EmptyPayload` reach the caller.
pub fn decode(payload: FramePayload) -> Result<Frame, FrameError> {
    let encoding = payload.encoding();
    match decode_strict(payload) {
        Err(FrameError::CorruptImage) => {
            log::warn!("Corrupt {} frame, serving placeholder", encoding);
            Ok(Frame::placeholder(encoding))
        }
        result => result,
    }
}

/// Decode a frame, reporting corrupt images as `CorruptImage`
pub fn decode_strict(payload: FramePayload) -> Result<Frame, FrameError> {
    let encoding = payload.encoding();
    log::debug!("Decoding {} frame", encoding);

    let resolved = resolve(payload)?;
    if !is_jpeg(&resolved.bytes) {
        return Err(FrameError::CorruptImage);
    }

    Ok(Frame::decoded(resolved.bytes, resolved.base64_body, resolved.data_url_prefix, encoding))
}

/// Check for the JPEG start-of-image marker
pub fn is_jpeg(bytes: &[u8]) -> bool {
    bytes.starts_with(&JPEG_MAGIC)
}

/// The fixed image served for corrupt frames
pub fn placeholder_jpeg() -> &'static [u8] {
    super::constants::PLACEHOLDER_JPEG
}

// ============================================================================
// RESOLUTION
// ============================================================================

fn resolve(payload: FramePayload) -> Result<Resolved, FrameError> {
    match payload {
        FramePayload::Binary(bytes) | FramePayload::TaggedBuffer(bytes) => from_bytes(bytes),
        FramePayload::HexEscaped(body) => resolve_hex(&body),
        FramePayload::DataUrl(url) => resolve_data_url(&url),
        FramePayload::Base64(body) => resolve_base64(&body),
    }
}

fn from_bytes(bytes: Vec<u8>) -> Result<Resolved, FrameError> {
    if bytes.is_empty() {
        return Err(FrameError::EmptyPayload);
    }
    Ok(Resolved {
        bytes,
        base64_body: None,
        data_url_prefix: None,
    })
}

fn resolve_hex(body: &str) -> Result<Resolved, FrameError> {
    if body.is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    let decoded = hex::decode(body)
        .map_err(|e| FrameError::unsupported(format!("invalid hex escape: {}", e)))?;

    // A real bytea column: the hex is the image itself
    if is_jpeg(&decoded) {
        return from_bytes(decoded);
    }

    let text = match String::from_utf8(decoded) {
        Ok(text) => text,
        Err(err) => return from_bytes(err.into_bytes()),
    };

    match FramePayload::from_text(&text)? {
        FramePayload::TaggedBuffer(bytes) => from_bytes(bytes),
        FramePayload::DataUrl(url) => resolve_data_url(&url),
        FramePayload::Base64(inner) => resolve_base64(&inner),
        FramePayload::HexEscaped(_) => Err(FrameError::unsupported("nested hex escape")),
        FramePayload::Binary(_) => Err(FrameError::unsupported("unrecognized hex-escaped content")),
    }
}

/// The header is kept as received; only the body is decoded
fn resolve_data_url(url: &str) -> Result<Resolved, FrameError> {
    let body = split_data_url(url)?;
    let prefix = &url[..url.len() - body.len()];

    let mut resolved = resolve_base64(body)?;
    resolved.data_url_prefix = Some(prefix.to_string());
    Ok(resolved)
}

fn resolve_base64(body: &str) -> Result<Resolved, FrameError> {
    let body = body.trim();
    if body.is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    // MIME-style bodies wrap lines; decode without the whitespace but
    // keep the body as received
    let bytes = if body.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        LENIENT_BASE64.decode(compact)
    } else {
        LENIENT_BASE64.decode(body)
    }
    .map_err(|e| FrameError::unsupported(format!("invalid base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(FrameError::EmptyPayload);
    }

    Ok(Resolved {
        bytes,
        base64_body: Some(body.to_string()),
        data_url_prefix: None,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::constants::{JPEG_DATA_URL_PREFIX, PLACEHOLDER_JPEG};
    use crate::frame::FrameEncoding;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::json;

    fn sample_jpeg() -> Vec<u8> {
        vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0xFF, 0xD9]
    }

    #[test]
    fn test_binary_passthrough() {
        let frame = decode(FramePayload::Binary(sample_jpeg())).unwrap();
        assert_eq!(frame.bytes(), sample_jpeg().as_slice());
        assert_eq!(frame.encoding(), FrameEncoding::Binary);
        assert!(!frame.is_placeholder());
    }

    #[test]
    fn test_tagged_buffer_starts_with_marker() {
        let value = json!({ "type": "Buffer", "data": [0xFF, 0xD8, 0xFF, 0xDB, 0x00] });
        let frame = decode(FramePayload::from_json(&value).unwrap()).unwrap();
        assert_eq!(&frame.bytes()[..2], &JPEG_MAGIC);
        assert_eq!(frame.encoding(), FrameEncoding::TaggedBuffer);
    }

    #[test]
    fn test_non_jpeg_bytes_become_placeholder() {
        let inputs: Vec<Vec<u8>> = vec![
            vec![0x00],
            vec![0x89, 0x50, 0x4E, 0x47],
            vec![0xD8, 0xFF],
            b"hello".to_vec(),
        ];

        for bytes in inputs {
            let frame = decode(FramePayload::Binary(bytes)).unwrap();
            assert!(frame.is_placeholder());
            assert_eq!(frame.bytes(), PLACEHOLDER_JPEG);
        }
    }

    #[test]
    fn test_strict_reports_corrupt_image() {
        let result = decode_strict(FramePayload::Binary(vec![0x00, 0x01]));
        assert_eq!(result, Err(FrameError::CorruptImage));
    }

    #[test]
    fn test_empty_binary_is_error_not_placeholder() {
        assert_eq!(decode(FramePayload::Binary(vec![])), Err(FrameError::EmptyPayload));
    }

    #[test]
    fn test_base64_body_preserved() {
        let bodies = [
            BASE64.encode(sample_jpeg()),
            "/9j/4AAQ".to_string(),
            // unpadded bodies are accepted and kept as-is
            "/9j/4AAQSkZJRg".to_string(),
        ];

        for body in bodies {
            let frame = decode(FramePayload::from_text(&body).unwrap()).unwrap();
            assert!(!frame.is_placeholder());

            let url = frame.to_data_url();
            let extracted = url.strip_prefix(JPEG_DATA_URL_PREFIX).unwrap();
            assert_eq!(extracted, body);
        }
    }

    #[test]
    fn test_data_url_passed_through() {
        let url = format!("data:image/jpeg;base64,{}", BASE64.encode(sample_jpeg()));
        let frame = decode(FramePayload::from_text(&url).unwrap()).unwrap();
        assert_eq!(frame.to_data_url(), url);
        assert_eq!(frame.encoding(), FrameEncoding::DataUrl);
    }

    #[test]
    fn test_data_url_header_kept() {
        let url = format!("data:image/jpg;base64,{}", BASE64.encode(sample_jpeg()));
        let frame = decode(FramePayload::from_text(&url).unwrap()).unwrap();
        assert_eq!(frame.to_data_url(), url);
        assert_eq!(frame.bytes(), sample_jpeg().as_slice());
    }

    /// Lines wrapped every 8 characters, MIME style
    fn wrapped_base64() -> (Vec<u8>, String) {
        let image: Vec<u8> = sample_jpeg().into_iter().cycle().take(60).collect();
        let flat = BASE64.encode(&image);
        let wrapped = flat
            .as_bytes()
            .chunks(8)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\r\n");
        (image, wrapped)
    }

    #[test]
    fn test_line_wrapped_base64() {
        let (image, wrapped) = wrapped_base64();

        let frame = decode_strict(FramePayload::from_text(&wrapped).unwrap()).unwrap();
        assert_eq!(frame.bytes(), image.as_slice());
        assert_eq!(frame.base64_body(), wrapped);

        let url = format!("data:image/jpeg;base64,{}", wrapped.replace("\r\n", "\n"));
        let frame = decode_strict(FramePayload::from_text(&url).unwrap()).unwrap();
        assert_eq!(frame.bytes(), image.as_slice());
    }

    #[test]
    fn test_line_wrapped_base64_in_binary_column() {
        let (image, wrapped) = wrapped_base64();
        let payload = FramePayload::from_stored_bytes(wrapped.into_bytes()).unwrap();
        assert_eq!(payload.encoding(), FrameEncoding::Base64);

        let frame = decode(payload).unwrap();
        assert!(!frame.is_placeholder());
        assert_eq!(frame.bytes(), image.as_slice());
    }

    #[test]
    fn test_data_url_with_empty_body() {
        let payload = FramePayload::from_text("data:image/jpeg;base64,").unwrap();
        assert_eq!(decode(payload), Err(FrameError::EmptyPayload));
    }

    #[test]
    fn test_invalid_base64_is_unsupported() {
        let payload = FramePayload::from_text("not base64 at all!").unwrap();
        assert!(matches!(decode(payload), Err(FrameError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_hex_escaped_raw_jpeg() {
        let text = format!("\\x{}", hex::encode(sample_jpeg()));
        let frame = decode(FramePayload::from_text(&text).unwrap()).unwrap();
        assert_eq!(frame.bytes(), sample_jpeg().as_slice());
        assert_eq!(frame.encoding(), FrameEncoding::HexEscaped);
    }

    #[test]
    fn test_hex_escaped_buffer_json() {
        let json_text = r#"{"type":"Buffer","data":[255,216,255,224]}"#;
        let text = format!("\\x{}", hex::encode(json_text));
        let frame = decode(FramePayload::from_text(&text).unwrap()).unwrap();
        assert_eq!(frame.bytes(), &[0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn test_hex_escaped_base64_with_bare_marker() {
        let body = BASE64.encode(sample_jpeg());
        let text = format!("x{}", hex::encode(&body));
        let frame = decode(FramePayload::from_text(&text).unwrap()).unwrap();
        assert_eq!(frame.bytes(), sample_jpeg().as_slice());
        assert_eq!(frame.base64_body(), body);
    }

    #[test]
    fn test_hex_escaped_data_url() {
        let url = format!("data:image/jpeg;base64,{}", BASE64.encode(sample_jpeg()));
        let text = format!("\\x{}", hex::encode(&url));
        let frame = decode(FramePayload::from_text(&text).unwrap()).unwrap();
        assert_eq!(frame.to_data_url(), url);
    }

    #[test]
    fn test_nested_hex_rejected() {
        let inner = format!("\\x{}", hex::encode(sample_jpeg()));
        let text = format!("\\x{}", hex::encode(inner));
        assert_eq!(
            decode(FramePayload::from_text(&text).unwrap()),
            Err(FrameError::unsupported("nested hex escape"))
        );
    }

    #[test]
    fn test_bad_hex_after_backslash_marker() {
        let payload = FramePayload::from_text("\\xzz").unwrap();
        assert!(matches!(decode(payload), Err(FrameError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_empty_hex_escape() {
        let payload = FramePayload::from_text("\\x").unwrap();
        assert_eq!(decode(payload), Err(FrameError::EmptyPayload));
    }

    #[test]
    fn test_hex_escaped_non_jpeg_binary_is_placeholder() {
        let text = format!("\\x{}", hex::encode([0x89, 0x50, 0x4E, 0x47, 0xFE]));
        let frame = decode(FramePayload::from_text(&text).unwrap()).unwrap();
        assert!(frame.is_placeholder());
    }

    #[test]
    fn test_data_url_round_trip() {
        let original = sample_jpeg();
        let url = Frame::from_jpeg_bytes(original.clone()).to_data_url();
        let decoded = decode(FramePayload::from_text(&url).unwrap()).unwrap();
        assert_eq!(decoded.into_bytes(), original);
    }

    #[test]
    fn test_placeholder_is_a_jpeg() {
        assert!(is_jpeg(placeholder_jpeg()));
        assert!(placeholder_jpeg().ends_with(&[0xFF, 0xD9]));
    }
}
