//! Threat feed handlers

use axum::{extract::{State, Query}, Json};
use serde::Deserialize;

use arcis_core::threat::rules::{ALERT_THRESHOLD, HIGH_PRIORITY_THRESHOLD};

use crate::{AppState, AppResult};
use crate::handlers::detections::threat_level_param;
use crate::models::{Detection, MAX_PAGE_SIZE};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

const RECENT_LIMIT: i64 = 20;

#[derive(Debug, Deserialize)]
pub struct ThreatQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RecentThreatQuery {
    pub limit: Option<i64>,
    pub min_threat_level: Option<i16>,
}

/// High-priority detections (threat level >= 6)
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ThreatQuery>,
) -> AppResult<Json<Vec<Detection>>> {
    require_clearance(&user, Clearance::Viewer)?;
    let limit = query.limit.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let threats = Detection::list_threats(&state.pool, i16::from(HIGH_PRIORITY_THRESHOLD), limit).await?;
    Ok(Json(threats))
}

/// Latest alert-level threats
pub async fn recent(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<RecentThreatQuery>,
) -> AppResult<Json<Vec<Detection>>> {
    require_clearance(&user, Clearance::Viewer)?;
    let (min_level, limit) = recent_params(&query)?;
    let threats = Detection::list_threats(&state.pool, min_level, limit).await?;
    Ok(Json(threats))
}

fn recent_params(query: &RecentThreatQuery) -> AppResult<(i16, i64)> {
    let min_level = match query.min_threat_level {
        Some(level) => i16::from(threat_level_param(level)?),
        None => i16::from(ALERT_THRESHOLD),
    };
    let limit = query.limit.unwrap_or(RECENT_LIMIT).clamp(1, MAX_PAGE_SIZE);
    Ok((min_level, limit))
}
