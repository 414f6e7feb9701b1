//! Reports handlers

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::Serialize;

use arcis_core::threat::rules::{CRITICAL_ALERT_MIN_SEVERITY, HIGH_PRIORITY_THRESHOLD};
use arcis_core::threat::{AlertSeverity, RiskCategory, ThreatLevel};

use crate::{AppState, AppResult};
use crate::models::{Alert, Detection, DetectionCounts, MANUAL_ENTRY};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

#[derive(Debug, Serialize)]
pub struct DetectionReport {
    #[serde(flatten)]
    pub counts: DetectionCounts,
    pub high_threat_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ThreatDistribution {
    pub total: i64,
    pub distribution: BTreeMap<&'static str, i64>,
}

#[derive(Debug, Default, PartialEq, Serialize)]
pub struct SeverityBreakdown {
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
}

#[derive(Debug, Serialize)]
pub struct AlertReport {
    pub total_unacknowledged: i64,
    pub severity_breakdown: SeverityBreakdown,
    pub critical_active: i64,
    pub weapon_type_detections_24h: BTreeMap<String, i64>,
}

#[derive(Debug, Serialize)]
pub struct ManualReport {
    pub total_manual_entries: i64,
    pub officers: BTreeMap<String, i64>,
    pub locations: BTreeMap<String, i64>,
    pub weapon_types: BTreeMap<String, i64>,
    pub threat_levels: BTreeMap<i16, i64>,
    pub recent_24h: i64,
}

/// Detection totals
pub async fn detections(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<DetectionReport>> {
    require_clearance(&user, Clearance::Operator)?;
    let counts = Detection::counts(&state.pool, None).await?;
    let high_threat_count = count_at_or_above(&counts.by_threat_level, i16::from(HIGH_PRIORITY_THRESHOLD));

    Ok(Json(DetectionReport { counts, high_threat_count }))
}

/// Detections per risk category
pub async fn threat_distribution(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<ThreatDistribution>> {
    require_clearance(&user, Clearance::Operator)?;
    let counts = Detection::counts(&state.pool, None).await?;
    Ok(Json(risk_distribution(&counts.by_threat_level)))
}

/// Unacknowledged alert summary
pub async fn alerts(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<AlertReport>> {
    require_clearance(&user, Clearance::Operator)?;
    let by_severity = Alert::count_unacknowledged_by_severity(&state.pool).await?;
    let weapon_type_detections_24h = Detection::recent_weapon_types(&state.pool).await?;

    let critical_active: i64 = by_severity
        .iter()
        .filter(|(severity, _)| *severity >= i16::from(CRITICAL_ALERT_MIN_SEVERITY))
        .map(|(_, count)| count)
        .sum();

    Ok(Json(AlertReport {
        total_unacknowledged: by_severity.iter().map(|(_, count)| count).sum(),
        severity_breakdown: severity_breakdown(&by_severity),
        critical_active,
        weapon_type_detections_24h,
    }))
}

/// Manual entry statistics
pub async fn manual(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<ManualReport>> {
    require_clearance(&user, Clearance::Operator)?;
    let counts = Detection::counts(&state.pool, Some(MANUAL_ENTRY)).await?;
    let officers = Detection::count_manual_by(&state.pool, "officer_name", "Unknown Officer").await?;
    let locations = Detection::count_manual_by(&state.pool, "location", "Unknown").await?;

    Ok(Json(ManualReport {
        total_manual_entries: counts.total,
        officers,
        locations,
        weapon_types: counts.by_weapon_type,
        threat_levels: counts.by_threat_level,
        recent_24h: counts.recent_24h,
    }))
}

fn count_at_or_above(by_level: &BTreeMap<i16, i64>, min_level: i16) -> i64 {
    by_level.range(min_level..).map(|(_, count)| count).sum()
}

/// Every category is present, zero when empty
fn risk_distribution(by_level: &BTreeMap<i16, i64>) -> ThreatDistribution {
    let mut distribution: BTreeMap<&'static str, i64> =
        RiskCategory::ALL.iter().map(|c| (c.as_str(), 0)).collect();

    for (&level, &count) in by_level {
        let category = ThreatLevel::try_from(level)
            .map(RiskCategory::from_level)
            .unwrap_or(RiskCategory::Unknown);
        *distribution.entry(category.as_str()).or_insert(0) += count;
    }

    ThreatDistribution {
        total: by_level.values().sum(),
        distribution,
    }
}

fn severity_breakdown(by_severity: &[(i16, i64)]) -> SeverityBreakdown {
    let mut breakdown = SeverityBreakdown::default();

    for &(severity, count) in by_severity {
        let bucket = u8::try_from(severity).ok().and_then(AlertSeverity::from_value);
        match bucket {
            Some(AlertSeverity::Critical) => breakdown.critical += count,
            Some(AlertSeverity::High) => breakdown.high += count,
            Some(AlertSeverity::Medium) => breakdown.medium += count,
            Some(AlertSeverity::Low | AlertSeverity::VeryLow) => breakdown.low += count,
            None => tracing::warn!(severity, "Alert with out-of-range severity"),
        }
    }

    breakdown
}
