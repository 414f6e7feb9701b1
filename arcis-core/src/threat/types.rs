//! Threat Types
//!
//! Core types for weapon threat classification. Data structures only.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClassifyError;

// ============================================================================
// OBJECT TYPE
// ============================================================================

/// Weapon categories the detectors report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectType {
    #[serde(rename = "Knife")]
    Knife,
    #[serde(rename = "Pistol")]
    Pistol,
    /// Generic weapon, subtype unknown
    #[serde(rename = "weapon")]
    Weapon,
    #[serde(rename = "rifle")]
    Rifle,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] = [
        ObjectType::Knife,
        ObjectType::Pistol,
        ObjectType::Weapon,
        ObjectType::Rifle,
    ];

    /// Canonical wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Knife => "Knife",
            ObjectType::Pistol => "Pistol",
            ObjectType::Weapon => "weapon",
            ObjectType::Rifle => "rifle",
        }
    }
}

impl FromStr for ObjectType {
    type Err = ClassifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ClassifyError::UnknownObjectType(s.to_string()))
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// THREAT LEVEL
// ============================================================================

/// Integer threat score, 0 to 10
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreatLevel(u8);

impl ThreatLevel {
    pub const MIN: ThreatLevel = ThreatLevel(super::rules::MIN_THREAT_LEVEL);
    pub const MAX: ThreatLevel = ThreatLevel(super::rules::MAX_THREAT_LEVEL);

    /// `None` above the maximum
    pub fn new(level: u8) -> Option<Self> {
        (level <= super::rules::MAX_THREAT_LEVEL).then_some(ThreatLevel(level))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub(crate) fn clamped(level: f64) -> Self {
        let max = f64::from(super::rules::MAX_THREAT_LEVEL);
        ThreatLevel(level.clamp(0.0, max) as u8)
    }
}

impl TryFrom<i16> for ThreatLevel {
    type Error = i16;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(ThreatLevel::new)
            .ok_or(value)
    }
}

impl From<ThreatLevel> for i16 {
    fn from(level: ThreatLevel) -> Self {
        i16::from(level.0)
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.0, super::rules::MAX_THREAT_LEVEL)
    }
}

// ============================================================================
// ALERT SEVERITY
// ============================================================================

/// Alert severity, 1 (very low) to 5 (critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertSeverity {
    VeryLow = 1,
    Low = 2,
    Medium = 3,
    High = 4,
    Critical = 5,
}

impl AlertSeverity {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(AlertSeverity::VeryLow),
            2 => Some(AlertSeverity::Low),
            3 => Some(AlertSeverity::Medium),
            4 => Some(AlertSeverity::High),
            5 => Some(AlertSeverity::Critical),
            _ => None,
        }
    }

    pub fn from_threat_level(level: ThreatLevel) -> Self {
        super::rules::severity_for_level(level.value())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::VeryLow => "very_low",
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
            AlertSeverity::Critical => "critical",
        }
    }
}

impl Serialize for AlertSeverity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

impl<'de> Deserialize<'de> for AlertSeverity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        AlertSeverity::from_value(value)
            .ok_or_else(|| serde::de::Error::custom(format!("alert severity {} is outside 1..=5", value)))
    }
}

// ============================================================================
// CLASSIFICATION RESULT
// ============================================================================

/// Result of classifying one detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub object_type: ObjectType,
    pub confidence: f64,
    pub threat_level: ThreatLevel,
}

impl Classification {
    /// Whether this detection must raise an alert
    pub fn is_alert_worthy(&self) -> bool {
        super::classifier::should_alert(self.threat_level)
    }

    pub fn alert_severity(&self) -> AlertSeverity {
        AlertSeverity::from_threat_level(self.threat_level)
    }

    /// Confidence as a whole percentage
    pub fn confidence_percent(&self) -> u32 {
        (self.confidence * 100.0).round() as u32
    }
}
