//! Threat Analysis
//!
//! Human-facing breakdown of a stored detection: risk and confidence
//! categories, indicators, recommended actions, time of day.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

use super::rules::{
    ALERT_THRESHOLD, CRITICAL_THRESHOLD, HIGH_CONFIDENCE, HIGH_CONFIDENCE_INDICATOR, LOW_CONFIDENCE,
    LOW_RISK_THRESHOLD, MEDIUM_CONFIDENCE, MEDIUM_RISK_THRESHOLD, VERY_HIGH_CONFIDENCE,
};
use super::types::{ObjectType, ThreatLevel};

// ============================================================================
// CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskCategory {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 5] = [
        RiskCategory::Critical,
        RiskCategory::High,
        RiskCategory::Medium,
        RiskCategory::Low,
        RiskCategory::Unknown,
    ];

    pub fn from_level(level: ThreatLevel) -> Self {
        match level.value() {
            l if l >= CRITICAL_THRESHOLD => RiskCategory::Critical,
            l if l >= ALERT_THRESHOLD => RiskCategory::High,
            l if l >= MEDIUM_RISK_THRESHOLD => RiskCategory::Medium,
            l if l >= LOW_RISK_THRESHOLD => RiskCategory::Low,
            _ => RiskCategory::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Critical => "CRITICAL",
            RiskCategory::High => "HIGH",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::Low => "LOW",
            RiskCategory::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceCategory {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceCategory {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= VERY_HIGH_CONFIDENCE {
            ConfidenceCategory::VeryHigh
        } else if confidence >= HIGH_CONFIDENCE {
            ConfidenceCategory::High
        } else if confidence >= MEDIUM_CONFIDENCE {
            ConfidenceCategory::Medium
        } else if confidence >= LOW_CONFIDENCE {
            ConfidenceCategory::Low
        } else {
            ConfidenceCategory::VeryLow
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    /// Buckets by UTC hour
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        match timestamp.hour() {
            6..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

// ============================================================================
// INDICATORS & ACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatIndicator {
    CriticalWeaponDetected,
    HighConfidenceDetection,
    HighLethalityWeapon,
    ConcealedWeaponPotential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    ImmediateLockdown,
    ContactLawEnforcement,
    EvacuateArea,
    AlertSecurityPersonnel,
    MonitorSituation,
    PrepareResponseTeam,
    IncreaseSurveillance,
    VerifyDetection,
    LogIncident,
    RoutineMonitoring,
}

fn indicators(object_type: ObjectType, confidence: f64, level: ThreatLevel) -> Vec<ThreatIndicator> {
    let mut out = Vec::new();

    if level.value() >= CRITICAL_THRESHOLD {
        out.push(ThreatIndicator::CriticalWeaponDetected);
    }
    if confidence >= HIGH_CONFIDENCE_INDICATOR {
        out.push(ThreatIndicator::HighConfidenceDetection);
    }
    match object_type {
        ObjectType::Rifle => out.push(ThreatIndicator::HighLethalityWeapon),
        ObjectType::Pistol => out.push(ThreatIndicator::ConcealedWeaponPotential),
        ObjectType::Knife | ObjectType::Weapon => {}
    }

    out
}

fn recommended_actions(level: ThreatLevel) -> Vec<RecommendedAction> {
    use RecommendedAction::*;

    match RiskCategory::from_level(level) {
        RiskCategory::Critical => vec![ImmediateLockdown, ContactLawEnforcement, EvacuateArea],
        RiskCategory::High => vec![AlertSecurityPersonnel, MonitorSituation, PrepareResponseTeam],
        RiskCategory::Medium => vec![IncreaseSurveillance, VerifyDetection],
        RiskCategory::Low | RiskCategory::Unknown => vec![LogIncident, RoutineMonitoring],
    }
}

// ============================================================================
// ANALYSIS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreatAnalysis {
    pub weapon_type: ObjectType,
    pub threat_level: ThreatLevel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub risk_category: RiskCategory,
    pub confidence_category: ConfidenceCategory,
    pub threat_indicators: Vec<ThreatIndicator>,
    pub recommended_actions: Vec<RecommendedAction>,
    pub time_of_day: TimeOfDay,
}

/// Analyze a stored detection. The level is taken as stored, not recomputed.
pub fn analyze(
    object_type: ObjectType,
    confidence: f64,
    threat_level: ThreatLevel,
    timestamp: DateTime<Utc>,
) -> ThreatAnalysis {
    ThreatAnalysis {
        weapon_type: object_type,
        threat_level,
        confidence,
        timestamp,
        risk_category: RiskCategory::from_level(threat_level),
        confidence_category: ConfidenceCategory::from_confidence(confidence),
        threat_indicators: indicators(object_type, confidence, threat_level),
        recommended_actions: recommended_actions(threat_level),
        time_of_day: TimeOfDay::from_timestamp(timestamp),
    }
}
