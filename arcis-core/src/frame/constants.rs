//! Frame Constants
//!
//! Markers and fixed images used by the decoder. Data only, no logic.

/// JPEG start-of-image marker
pub const JPEG_MAGIC: [u8; 2] = [0xFF, 0xD8];

/// MIME type of every normalized frame
pub const JPEG_MIME: &str = "image/jpeg";

/// Header prepended to a JPEG base64 body
pub const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Scheme that marks a data-URL string
pub const DATA_URL_SCHEME: &str = "data:";

/// Media-type prefix a frame data-URL must carry
pub const DATA_URL_IMAGE_PREFIX: &str = "image/";

/// Encoding suffix a frame data-URL must carry
pub const DATA_URL_BASE64_SUFFIX: &str = ";base64";

/// Postgres `bytea` hex output form
pub const BYTEA_HEX_MARKER: &str = "\\x";

/// Bare hex marker (bytea text with the backslash stripped)
pub const HEX_MARKER: &str = "x";

/// `type` tag of a serialized Node-style buffer
pub const TAGGED_BUFFER_TYPE: &str = "Buffer";

/// Served in place of a corrupt frame: 100x100 baseline JPEG
pub const PLACEHOLDER_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    0x01, 0x01, 0x00, 0x48, 0x00, 0x48, 0x00, 0x00, 0xFF, 0xDB, 0x00, 0x43,
    0x00, 0x08, 0x06, 0x06, 0x07, 0x06, 0x05, 0x08, 0x07, 0x07, 0x07, 0x09,
    0x09, 0x08, 0x0A, 0x0C, 0x14, 0x0D, 0x0C, 0x0B, 0x0B, 0x0C, 0x19, 0x12,
    0x13, 0x0F, 0x14, 0x1D, 0x1A, 0x1F, 0x1E, 0x1D, 0x1A, 0x1C, 0x1C, 0x20,
    0x24, 0x2E, 0x27, 0x20, 0x22, 0x2C, 0x23, 0x1C, 0x1C, 0x28, 0x37, 0x29,
    0x2C, 0x30, 0x31, 0x34, 0x34, 0x34, 0x1F, 0x27, 0x39, 0x3D, 0x38, 0x32,
    0x3C, 0x2E, 0x33, 0x34, 0x32, 0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x64,
    0x00, 0x64, 0x01, 0x01, 0x11, 0x00, 0x02, 0x11, 0x01, 0x03, 0x11, 0x01,
    0xFF, 0xC4, 0x00, 0x15, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x08, 0xFF,
    0xC4, 0x00, 0x14, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xDA, 0x00,
    0x0C, 0x03, 0x01, 0x00, 0x02, 0x11, 0x03, 0x11, 0x00, 0x3F, 0x00, 0xF0,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xFF, 0xD9,
];
