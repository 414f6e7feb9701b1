//! Alert planning
//!
//! Decides whether a classification raises an alert and with what content.
//! The caller performs exactly one insert per returned plan.

use serde::Serialize;

use super::rules::CRITICAL_THRESHOLD;
use super::types::{AlertSeverity, Classification};

pub const WEAPON_DETECTED_ALERT: &str = "weapon_detected";

pub const SECURITY_CATEGORY: &str = "security";

/// Everything needed to persist an automatic alert
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPlan {
    pub severity: AlertSeverity,
    pub alert_type: &'static str,
    pub category: &'static str,
    pub action_required: String,
}

/// `Some` iff the classification is alert-worthy
pub fn plan_alert(classification: &Classification) -> Option<AlertPlan> {
    if !classification.is_alert_worthy() {
        return None;
    }

    Some(AlertPlan {
        severity: classification.alert_severity(),
        alert_type: WEAPON_DETECTED_ALERT,
        category: SECURITY_CATEGORY,
        action_required: action_required(classification),
    })
}

fn action_required(classification: &Classification) -> String {
    let prefix = if classification.threat_level.value() >= CRITICAL_THRESHOLD {
        "CRITICAL: Immediate response required"
    } else {
        "HIGH PRIORITY: Response required"
    };

    format!(
        "{} - {} detected with {}% confidence",
        prefix,
        classification.object_type,
        classification.confidence_percent()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::threat::classify;

    #[test]
    fn test_no_plan_below_threshold() {
        assert!(plan_alert(&classify("Knife", 1.0).unwrap()).is_none());
        assert!(plan_alert(&classify("Pistol", 0.8).unwrap()).is_none()); // 6.4 -> 6
    }

    #[test]
    fn test_high_priority_plan() {
        let plan = plan_alert(&classify("Pistol", 0.9).unwrap()).unwrap();
        assert_eq!(plan.severity, AlertSeverity::High);
        assert_eq!(plan.alert_type, "weapon_detected");
        assert_eq!(plan.category, "security");
        assert_eq!(
            plan.action_required,
            "HIGH PRIORITY: Response required - Pistol detected with 90% confidence"
        );
    }

    #[test]
    fn test_critical_plan() {
        let plan = plan_alert(&classify("rifle", 0.95).unwrap()).unwrap();
        assert_eq!(plan.severity, AlertSeverity::Critical);
        assert_eq!(
            plan.action_required,
            "CRITICAL: Immediate response required - rifle detected with 95% confidence"
        );
    }

    #[test]
    fn test_one_plan_per_alert_worthy_level() {
        let mut planned = 0;
        let mut worthy = 0;
        for step in 0..=20 {
            let c = classify("rifle", f64::from(step) / 20.0).unwrap();
            if c.threat_level.value() >= 7 {
                worthy += 1;
            }
            planned += plan_alert(&c).into_iter().count();
        }
        assert_eq!(planned, worthy);
        assert!(worthy > 0);
    }
}
