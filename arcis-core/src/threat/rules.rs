//! Threat Rules & Thresholds
//!
//! Severity tables and thresholds for weapon classification.
//! Constants and lookup tables only; the classification itself lives in
//! `classifier`.

use super::types::{AlertSeverity, ObjectType};

// ============================================================================
// BASE SEVERITY (per object type)
// ============================================================================

pub const KNIFE_BASE_SEVERITY: u8 = 6;

/// Generic weapon, type not identified
pub const WEAPON_BASE_SEVERITY: u8 = 7;

pub const PISTOL_BASE_SEVERITY: u8 = 8;

pub const RIFLE_BASE_SEVERITY: u8 = 10;

/// Base severity before confidence weighting
pub const fn base_severity(object_type: ObjectType) -> u8 {
    match object_type {
        ObjectType::Knife => KNIFE_BASE_SEVERITY,
        ObjectType::Weapon => WEAPON_BASE_SEVERITY,
        ObjectType::Pistol => PISTOL_BASE_SEVERITY,
        ObjectType::Rifle => RIFLE_BASE_SEVERITY,
    }
}

// ============================================================================
// THREAT LEVEL BOUNDS
// ============================================================================

pub const MIN_THREAT_LEVEL: u8 = 0;

pub const MAX_THREAT_LEVEL: u8 = 10;

pub const MIN_CONFIDENCE: f64 = 0.0;

pub const MAX_CONFIDENCE: f64 = 1.0;

// ============================================================================
// ALERTING
// ============================================================================

/// At or above this level an alert is raised
pub const ALERT_THRESHOLD: u8 = 7;

/// At or above this level the alert is critical
pub const CRITICAL_THRESHOLD: u8 = 9;

pub const MEDIUM_SEVERITY_THRESHOLD: u8 = 5;

pub const LOW_SEVERITY_THRESHOLD: u8 = 3;

/// Threat level → alert severity step function
pub const fn severity_for_level(level: u8) -> AlertSeverity {
    if level >= CRITICAL_THRESHOLD {
        AlertSeverity::Critical
    } else if level >= ALERT_THRESHOLD {
        AlertSeverity::High
    } else if level >= MEDIUM_SEVERITY_THRESHOLD {
        AlertSeverity::Medium
    } else if level >= LOW_SEVERITY_THRESHOLD {
        AlertSeverity::Low
    } else {
        AlertSeverity::VeryLow
    }
}

/// Detections at or above this level are listed as active threats
pub const HIGH_PRIORITY_THRESHOLD: u8 = 6;

/// Minimum severity an alert needs to count as critical in listings
pub const CRITICAL_ALERT_MIN_SEVERITY: u8 = 4;

// ============================================================================
// ANALYSIS TIERS
// ============================================================================

pub const MEDIUM_RISK_THRESHOLD: u8 = 4;

pub const LOW_RISK_THRESHOLD: u8 = 1;

pub const VERY_HIGH_CONFIDENCE: f64 = 0.9;

pub const HIGH_CONFIDENCE: f64 = 0.7;

pub const MEDIUM_CONFIDENCE: f64 = 0.5;

pub const LOW_CONFIDENCE: f64 = 0.3;

/// Confidence that earns the HIGH_CONFIDENCE_DETECTION indicator
pub const HIGH_CONFIDENCE_INDICATOR: f64 = 0.8;
