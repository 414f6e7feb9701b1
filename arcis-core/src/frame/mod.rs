//! Frame Module
//!
//! Normalizes detection frames into displayable JPEGs.
//!
//! Frames reach the backend in whatever shape the producer happened to use:
//! raw bytes, serialized Node buffers, Postgres bytea hex text, data-URLs or
//! bare base64. [`FramePayload`] names those shapes; [`decode`] turns one
//! into a [`Frame`].
//!
//! ## Structure
//! - `constants`: markers and the placeholder image
//! - `types`: `FramePayload`, `FrameEncoding`, `Frame`
//! - `decoder`: decoding and validation
//!
//! ## Usage
//! ```
//! use arcis_core::frame::{decode, FramePayload};
//!
//! let payload = FramePayload::from_text("data:image/jpeg;base64,/9j/4AAQ").unwrap();
//! let frame = decode(payload).unwrap();
//! assert!(!frame.is_placeholder());
//! assert_eq!(frame.to_data_url(), "data:image/jpeg;base64,/9j/4AAQ");
//! ```

pub mod constants;
pub mod types;
pub mod decoder;

pub use types::{Frame, FrameEncoding, FramePayload};

pub use constants::{JPEG_DATA_URL_PREFIX, JPEG_MAGIC, JPEG_MIME, PLACEHOLDER_JPEG};

pub use decoder::{decode, decode_strict, is_jpeg, placeholder_jpeg};
