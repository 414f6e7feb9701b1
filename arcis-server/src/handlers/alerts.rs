//! Alert handlers

use axum::{extract::{State, Path, Query}, http::StatusCode, Json};
use serde::Serialize;
use validator::Validate;

use arcis_core::threat::{AlertSeverity, ObjectType};

use crate::{AppState, AppResult, AppError};
use crate::models::{AcknowledgeRequest, Alert, AlertFilter, CreateAlertRequest, Detection};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

#[derive(Debug, Serialize)]
pub struct AlertDetail {
    pub alert: Alert,
    pub related_detection: Option<Detection>,
}

/// List alerts
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(filter): Query<AlertFilter>,
) -> AppResult<Json<Vec<Alert>>> {
    require_clearance(&user, Clearance::Operator)?;
    if let Some(severity) = filter.min_severity {
        severity_param(severity)?;
    }
    let alerts = Alert::list(&state.pool, &filter).await?;
    Ok(Json(alerts))
}

fn severity_param(severity: i16) -> AppResult<AlertSeverity> {
    u8::try_from(severity)
        .ok()
        .and_then(AlertSeverity::from_value)
        .ok_or_else(|| AppError::bad_request("min_severity must be between 1 and 5", "INVALID_SEVERITY"))
}

/// Raise a manual alert
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateAlertRequest>,
) -> AppResult<(StatusCode, Json<Alert>)> {
    require_clearance(&user, Clearance::Operator)?;
    let weapon_type = validate_manual_alert(&req)?;

    if let Some(detection_id) = req.detection_id {
        if !Detection::exists(&state.pool, detection_id).await? {
            return Err(AppError::detection_not_found());
        }
    }

    let alert = Alert::create_manual(&state.pool, &req, weapon_type, user.user_id).await?;
    tracing::info!(alert_id = alert.id, severity = alert.severity, user_id = %user.user_id, "Manual alert created");

    Ok((StatusCode::CREATED, Json(alert)))
}

/// Weapon type recorded on the alert; "unknown" when the officer gave none
fn validate_manual_alert(req: &CreateAlertRequest) -> AppResult<&str> {
    req.validate()?;
    match req.weapon_type.as_deref() {
        Some(weapon_type) => Ok(weapon_type.parse::<ObjectType>()?.as_str()),
        None => Ok("unknown"),
    }
}

/// Get alert with its detection
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Json<AlertDetail>> {
    require_clearance(&user, Clearance::Operator)?;
    let alert = Alert::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(AppError::alert_not_found)?;

    let related_detection = match alert.detection_id {
        Some(detection_id) => Detection::find_by_id(&state.pool, detection_id).await?,
        None => None,
    };

    Ok(Json(AlertDetail { alert, related_detection }))
}

/// Acknowledge an alert; the body is optional
pub async fn acknowledge(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
    body: Option<Json<AcknowledgeRequest>>,
) -> AppResult<Json<Alert>> {
    require_clearance(&user, Clearance::Operator)?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let notes = req.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());

    let alert = Alert::acknowledge(&state.pool, id, user.user_id, notes)
        .await?
        .ok_or_else(AppError::alert_not_found)?;

    tracing::info!(alert_id = id, user_id = %user.user_id, "Alert acknowledged");
    Ok(Json(alert))
}
