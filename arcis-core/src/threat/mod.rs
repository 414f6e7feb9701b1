//! Threat Module
//!
//! Scores weapon detections and decides which of them raise alerts.
//!
//! ## Structure
//! - `types`: `ObjectType`, `ThreatLevel`, `AlertSeverity`, `Classification`
//! - `rules`: severity tables and thresholds
//! - `classifier`: classification logic
//! - `alert`: alert planning for alert-worthy classifications
//! - `labels`: detector class/label mapping
//! - `analysis`: per-detection threat analysis
//!
//! ## Usage
//! ```
//! use arcis_core::threat::{classify, plan_alert, AlertSeverity};
//!
//! let c = classify("rifle", 0.95).unwrap();
//! assert_eq!(c.threat_level.value(), 10);
//!
//! let plan = plan_alert(&c).unwrap();
//! assert_eq!(plan.severity, AlertSeverity::Critical);
//! ```

pub mod types;
pub mod rules;
pub mod classifier;
pub mod alert;
pub mod labels;
pub mod analysis;

pub use types::{AlertSeverity, Classification, ObjectType, ThreatLevel};

pub use classifier::{classify, classify_typed, should_alert, threat_level};

pub use alert::{plan_alert, AlertPlan};

pub use analysis::{
    analyze, ConfidenceCategory, RecommendedAction, RiskCategory, ThreatAnalysis, ThreatIndicator,
    TimeOfDay,
};
