//! Stored frame model
//!
//! A detection keeps at most one frame, in exactly one of three columns.
//! [`StoredFrame`] is that choice; the schema enforces the same rule with a
//! CHECK constraint.

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::FromRow;

use arcis_core::frame::{decode, decode_strict, Frame, FrameEncoding, FramePayload};

use crate::{AppError, AppResult};

/// Frame columns of a detection row
#[derive(Debug, Clone, FromRow)]
pub struct FrameRow {
    pub frame_data: Option<String>,
    pub frame_jpeg: Option<Vec<u8>>,
    pub frame_url: Option<String>,
    pub frame_metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoredFrame {
    /// `frame_data`: a `data:image/jpeg;base64,` string
    DataUrl(String),
    /// `frame_jpeg`: raw bytes
    Jpeg(Vec<u8>),
    /// `frame_url`: external reference
    Url(String),
}

/// What a reader gets back for a stored frame
#[derive(Debug)]
pub enum RenderedFrame {
    Image(Frame),
    External(String),
}

impl StoredFrame {
    /// Pick the populated column, if any.
    ///
    /// Rows predating the constraint may have several; inline data wins,
    /// then binary, then URL.
    pub fn from_row(row: FrameRow) -> Option<Self> {
        row.frame_data
            .filter(|s| !s.is_empty())
            .map(StoredFrame::DataUrl)
            .or_else(|| row.frame_jpeg.filter(|b| !b.is_empty()).map(StoredFrame::Jpeg))
            .or_else(|| row.frame_url.filter(|s| !s.is_empty()).map(StoredFrame::Url))
    }

    /// Column values in `(frame_data, frame_jpeg, frame_url)` order
    pub fn columns(&self) -> (Option<&str>, Option<&[u8]>, Option<&str>) {
        match self {
            StoredFrame::DataUrl(s) => (Some(s.as_str()), None, None),
            StoredFrame::Jpeg(b) => (None, Some(b.as_slice()), None),
            StoredFrame::Url(s) => (None, None, Some(s.as_str())),
        }
    }

    /// Decode for display. Stored data that no longer decodes is served as
    /// the placeholder.
    pub fn render(&self) -> RenderedFrame {
        let decoded = match self {
            StoredFrame::Url(url) => return RenderedFrame::External(url.clone()),
            StoredFrame::DataUrl(text) => FramePayload::from_text(text).and_then(decode),
            StoredFrame::Jpeg(bytes) => FramePayload::from_stored_bytes(bytes.clone()).and_then(decode),
        };

        match decoded {
            Ok(frame) => RenderedFrame::Image(frame),
            Err(err) => {
                tracing::warn!("Stored frame is undecodable ({}), serving placeholder", err);
                RenderedFrame::Image(Frame::placeholder(FrameEncoding::Binary))
            }
        }
    }
}

/// A validated frame ready to persist
#[derive(Debug, Clone)]
pub struct FrameUpload {
    pub frame: StoredFrame,
    pub metadata: Value,
}

/// How an accepted inline frame is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStorage {
    /// String inputs stay a data-URL, byte inputs become binary
    AsReceived,
    /// Always binary JPEG
    Binary,
}

/// Resolve the optional frame fields of an ingestion request.
///
/// Inline frames are decoded strictly: a corrupt image is rejected rather
/// than stored as a placeholder.
pub fn resolve_frame_source(
    frame_data: Option<&Value>,
    frame_url: Option<&str>,
    storage: FrameStorage,
) -> AppResult<Option<FrameUpload>> {
    let frame_data = frame_data.filter(|v| !v.is_null());
    let frame_url = frame_url.map(str::trim).filter(|u| !u.is_empty());

    match (frame_data, frame_url) {
        (Some(_), Some(_)) => Err(AppError::bad_request(
            "Provide either frame_data or frame_url, not both",
            "FRAME_CONFLICT",
        )),
        (Some(value), None) => {
            let payload = FramePayload::from_json(value)?;
            let frame = decode_strict(payload)?;
            Ok(Some(inline_upload(frame, storage)))
        }
        (None, Some(url)) => Ok(Some(FrameUpload {
            frame: StoredFrame::Url(url.to_string()),
            metadata: json!({
                "format": "url",
                "stored_at": Utc::now(),
            }),
        })),
        (None, None) => Ok(None),
    }
}

fn inline_upload(frame: Frame, storage: FrameStorage) -> FrameUpload {
    let metadata = frame_metadata(&frame);
    let keep_text = storage == FrameStorage::AsReceived
        && matches!(frame.encoding(), FrameEncoding::DataUrl | FrameEncoding::Base64);

    let stored = if keep_text {
        StoredFrame::DataUrl(frame.to_data_url())
    } else {
        StoredFrame::Jpeg(frame.into_bytes())
    };

    FrameUpload { frame: stored, metadata }
}

fn frame_metadata(frame: &Frame) -> Value {
    json!({
        "size": frame.len(),
        "format": "jpeg",
        "mime_type": frame.mime_type(),
        "source_encoding": frame.encoding().as_str(),
        "stored_at": Utc::now(),
    })
}

/// Error raised when a detection has no frame of any kind
pub fn no_frame_data() -> AppError {
    AppError::not_found("No frame data available for this detection", "NO_FRAME_DATA")
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0xFF, 0xD9];

    fn jpeg_base64() -> String {
        Frame::from_jpeg_bytes(JPEG.to_vec()).base64_body().to_string()
    }

    #[test]
    fn test_both_sources_conflict() {
        let data = json!(jpeg_base64());
        let err = resolve_frame_source(Some(&data), Some("http://cam/1.jpg"), FrameStorage::AsReceived)
            .unwrap_err();
        assert_eq!(err.code(), "FRAME_CONFLICT");
    }

    #[test]
    fn test_no_source() {
        let null = Value::Null;
        assert!(resolve_frame_source(Some(&null), Some("  "), FrameStorage::AsReceived)
            .unwrap()
            .is_none());
        assert!(resolve_frame_source(None, None, FrameStorage::Binary).unwrap().is_none());
    }

    #[test]
    fn test_base64_kept_as_data_url() {
        let data = json!(jpeg_base64());
        let upload = resolve_frame_source(Some(&data), None, FrameStorage::AsReceived)
            .unwrap()
            .unwrap();
        assert_eq!(
            upload.frame,
            StoredFrame::DataUrl(format!("data:image/jpeg;base64,{}", jpeg_base64()))
        );
        assert_eq!(upload.metadata["source_encoding"], "base64");
        assert_eq!(upload.metadata["size"], JPEG.len());
    }

    #[test]
    fn test_data_url_header_survives_storage() {
        let url = format!("data:image/jpg;base64,{}", jpeg_base64());
        let upload = resolve_frame_source(Some(&json!(url)), None, FrameStorage::AsReceived)
            .unwrap()
            .unwrap();
        assert_eq!(upload.frame, StoredFrame::DataUrl(url.clone()));

        match upload.frame.render() {
            RenderedFrame::Image(frame) => assert_eq!(frame.to_data_url(), url),
            RenderedFrame::External(_) => panic!("inline frame rendered as a URL"),
        }
    }

    #[test]
    fn test_tagged_buffer_stored_as_binary() {
        let data = json!({ "type": "Buffer", "data": JPEG });
        let upload = resolve_frame_source(Some(&data), None, FrameStorage::AsReceived)
            .unwrap()
            .unwrap();
        assert_eq!(upload.frame, StoredFrame::Jpeg(JPEG.to_vec()));
    }

    #[test]
    fn test_backfill_always_binary() {
        let data = json!(jpeg_base64());
        let upload = resolve_frame_source(Some(&data), None, FrameStorage::Binary)
            .unwrap()
            .unwrap();
        assert_eq!(upload.frame, StoredFrame::Jpeg(JPEG.to_vec()));
    }

    #[test]
    fn test_corrupt_frame_rejected_at_ingestion() {
        let data = json!({ "type": "Buffer", "data": [1, 2, 3] });
        let err = resolve_frame_source(Some(&data), None, FrameStorage::AsReceived).unwrap_err();
        assert_eq!(err.code(), "CORRUPT_IMAGE");
    }

    #[test]
    fn test_single_column_per_variant() {
        let variants = [
            StoredFrame::DataUrl("data:image/jpeg;base64,/9j/".into()),
            StoredFrame::Jpeg(JPEG.to_vec()),
            StoredFrame::Url("http://cam/1.jpg".into()),
        ];
        for v in variants {
            let (a, b, c) = v.columns();
            let populated = [a.is_some(), b.is_some(), c.is_some()].iter().filter(|x| **x).count();
            assert_eq!(populated, 1);
        }
    }

    #[test]
    fn test_from_row_prefers_inline() {
        let row = FrameRow {
            frame_data: Some("data:image/jpeg;base64,/9j/".into()),
            frame_jpeg: Some(JPEG.to_vec()),
            frame_url: None,
            frame_metadata: None,
        };
        assert!(matches!(StoredFrame::from_row(row), Some(StoredFrame::DataUrl(_))));

        let empty = FrameRow {
            frame_data: Some(String::new()),
            frame_jpeg: None,
            frame_url: None,
            frame_metadata: None,
        };
        assert!(StoredFrame::from_row(empty).is_none());
    }

    #[test]
    fn test_render_legacy_json_in_bytea() {
        let legacy = br#"{"type":"Buffer","data":[255,216,255,217]}"#.to_vec();
        match StoredFrame::Jpeg(legacy).render() {
            RenderedFrame::Image(frame) => {
                assert!(!frame.is_placeholder());
                assert_eq!(frame.bytes(), &[0xFF, 0xD8, 0xFF, 0xD9]);
            }
            RenderedFrame::External(_) => panic!("expected image"),
        }
    }

    #[test]
    fn test_render_corrupt_is_placeholder() {
        match StoredFrame::Jpeg(vec![0x00, 0x01, 0x02]).render() {
            RenderedFrame::Image(frame) => assert!(frame.is_placeholder()),
            RenderedFrame::External(_) => panic!("expected image"),
        }
    }
}
