//! Threat Classifier
//!
//! Classification logic only. Tables and thresholds live in `rules`.
//! Input: object type + detector confidence
//! Output: Classification

use super::rules::{base_severity, ALERT_THRESHOLD, MAX_CONFIDENCE, MIN_CONFIDENCE};
use super::types::{Classification, ObjectType, ThreatLevel};
use crate::error::ClassifyError;

// ============================================================================
// MAIN CLASSIFICATION FUNCTION
// ============================================================================

/// Classify a detection from its wire object-type name
pub fn classify(object_type: &str, confidence: f64) -> Result<Classification, ClassifyError> {
    let object_type: ObjectType = object_type.parse()?;
    classify_typed(object_type, confidence)
}

/// Classify a detection whose object type is already known
pub fn classify_typed(object_type: ObjectType, confidence: f64) -> Result<Classification, ClassifyError> {
    validate_confidence(confidence)?;

    let threat_level = threat_level(object_type, confidence);
    log::debug!(
        "Classified {} @ {:.2} as threat level {}",
        object_type,
        confidence,
        threat_level
    );

    Ok(Classification {
        object_type,
        confidence,
        threat_level,
    })
}

/// Base severity weighted by confidence, rounded half-up and capped.
///
/// Assumes `confidence` is already validated.
pub fn threat_level(object_type: ObjectType, confidence: f64) -> ThreatLevel {
    let weighted = f64::from(base_severity(object_type)) * confidence;
    ThreatLevel::clamped(weighted.round())
}

/// Alert iff the level meets the alert threshold
pub fn should_alert(level: ThreatLevel) -> bool {
    level.value() >= ALERT_THRESHOLD
}

fn validate_confidence(confidence: f64) -> Result<(), ClassifyError> {
    // NaN fails the range check too
    if (MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&confidence) {
        Ok(())
    } else {
        Err(ClassifyError::InvalidConfidence(confidence))
    }
}

// ============================================================================
// TESTS
// ============================================================================
