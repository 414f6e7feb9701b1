//! Error types
//!
//! Frame decoding and threat classification report failures as typed
//! results. Nothing in this crate swallows an error; the one recovery path
//! is the placeholder substitution in [`crate::frame::decode`].

use thiserror::Error;

/// Frame decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The payload shape or string encoding is not one we understand
    #[error("unsupported frame encoding: {0}")]
    UnsupportedEncoding(String),

    /// The payload decoded to zero bytes
    #[error("frame payload is empty")]
    EmptyPayload,

    /// Decoded bytes do not start with the JPEG SOI marker
    #[error("frame is not a valid JPEG image")]
    CorruptImage,
}

impl FrameError {
    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::UnsupportedEncoding(_) => "UNSUPPORTED_ENCODING",
            FrameError::EmptyPayload => "EMPTY_PAYLOAD",
            FrameError::CorruptImage => "CORRUPT_IMAGE",
        }
    }

    pub(crate) fn unsupported(detail: impl Into<String>) -> Self {
        FrameError::UnsupportedEncoding(detail.into())
    }
}

/// Threat classification failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),

    #[error("unknown object type '{0}'; expected one of: Knife, Pistol, weapon, rifle")]
    UnknownObjectType(String),
}

impl ClassifyError {
    /// Stable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            ClassifyError::InvalidConfidence(_) => "INVALID_CONFIDENCE",
            ClassifyError::UnknownObjectType(_) => "INVALID_WEAPON_TYPE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_distinct() {
        let codes = [
            FrameError::UnsupportedEncoding("x".into()).code(),
            FrameError::EmptyPayload.code(),
            FrameError::CorruptImage.code(),
            ClassifyError::InvalidConfidence(2.0).code(),
            ClassifyError::UnknownObjectType("bat".into()).code(),
        ];

        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ClassifyError::UnknownObjectType("slingshot".into());
        assert!(err.to_string().contains("slingshot"));

        let err = FrameError::unsupported("bad hex");
        assert_eq!(err.to_string(), "unsupported frame encoding: bad hex");
    }
}
