//! Detection handlers

use axum::{extract::{State, Path, Query}, Json};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use arcis_core::threat::{analyze, ObjectType, ThreatAnalysis, ThreatLevel};

use crate::{AppState, AppResult, AppError};
use crate::models::{AddCommentRequest, Comment, Detection, DetectionFilter, DEVICE_ENTRY, MANUAL_ENTRY};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

pub const MAX_COMMENT_LENGTH: usize = 2000;

#[derive(Debug, Serialize)]
pub struct DetectionDetail {
    pub detection: Detection,
    pub weapon_details: WeaponDetails,
}

#[derive(Debug, Serialize)]
pub struct WeaponDetails {
    pub weapon_type: String,
    pub threat_assessment: &'static str,
    pub confidence_level: &'static str,
    pub detection_method: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteAllResponse {
    pub deleted_count: u64,
}

#[derive(Debug, Serialize)]
pub struct CommentAdded {
    pub detection_id: i64,
    pub comment: Comment,
    pub total_comments: i32,
}

#[derive(Debug, Serialize)]
pub struct ThreatAnalysisResponse {
    pub detection_id: i64,
    #[serde(flatten)]
    pub analysis: ThreatAnalysis,
    pub context: AnalysisContext,
}

#[derive(Debug, Serialize)]
pub struct AnalysisContext {
    pub device_type: String,
    pub location: String,
    pub system_metrics: Option<Value>,
}

/// List detections
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(filter): Query<DetectionFilter>,
) -> AppResult<Json<Vec<Detection>>> {
    require_clearance(&user, Clearance::Viewer)?;
    validate_filter(&filter)?;
    let detections = Detection::list(&state.pool, &filter).await?;
    Ok(Json(detections))
}

fn validate_filter(filter: &DetectionFilter) -> AppResult<()> {
    if let Some(object_type) = &filter.object_type {
        object_type.parse::<ObjectType>()?;
    }
    if let Some(entry_type) = &filter.entry_type {
        if entry_type != MANUAL_ENTRY && entry_type != DEVICE_ENTRY {
            return Err(AppError::bad_request(
                "entry_type must be 'manual' or 'device'",
                "INVALID_ENTRY_TYPE",
            ));
        }
    }
    if let Some(level) = filter.min_threat_level {
        threat_level_param(level)?;
    }
    Ok(())
}

/// Validate a `min_threat_level` style query parameter
pub fn threat_level_param(level: i16) -> AppResult<ThreatLevel> {
    ThreatLevel::try_from(level).map_err(|level| {
        AppError::bad_request(format!("threat level {} is outside 0..=10", level), "INVALID_THREAT_LEVEL")
    })
}

/// Get single detection
pub async fn get(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Json<DetectionDetail>> {
    require_clearance(&user, Clearance::Operator)?;
    let detection = Detection::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(AppError::detection_not_found)?;

    let weapon_details = weapon_details(&detection);
    Ok(Json(DetectionDetail { detection, weapon_details }))
}

fn weapon_details(detection: &Detection) -> WeaponDetails {
    let threat_assessment = match detection.threat_level {
        l if l >= 7 => "High",
        l if l >= 4 => "Medium",
        _ => "Low",
    };
    let confidence_level = match detection.confidence {
        c if c >= 0.8 => "High",
        c if c >= 0.5 => "Medium",
        _ => "Low",
    };

    WeaponDetails {
        weapon_type: detection.object_type.clone(),
        threat_assessment,
        confidence_level,
        detection_method: detection.metadata_str("device_type").unwrap_or("Unknown").to_string(),
    }
}

/// Delete one detection (its alerts cascade)
pub async fn delete(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Json<Detection>> {
    require_clearance(&user, Clearance::Commander)?;
    let detection = Detection::delete(&state.pool, id)
        .await?
        .ok_or_else(AppError::detection_not_found)?;

    tracing::info!(detection_id = id, user_id = %user.user_id, "Detection deleted");
    Ok(Json(detection))
}

/// Delete every detection
pub async fn delete_all(
    State(state): State<AppState>,
    user: UserContext,
) -> AppResult<Json<DeleteAllResponse>> {
    require_clearance(&user, Clearance::Admin)?;
    let deleted_count = Detection::delete_all(&state.pool).await?;
    if deleted_count == 0 {
        return Err(AppError::not_found("No detection records found to delete", "NO_DETECTIONS_FOUND"));
    }

    tracing::warn!(deleted_count, user_id = %user.user_id, "All detections deleted");
    Ok(Json(DeleteAllResponse { deleted_count }))
}

/// Append a reviewer comment
pub async fn add_comment(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
    Json(req): Json<AddCommentRequest>,
) -> AppResult<Json<CommentAdded>> {
    require_clearance(&user, Clearance::Operator)?;
    let comment = build_comment(&req.comment, &user)?;

    let total_comments = Detection::add_comment(&state.pool, id, &comment)
        .await?
        .ok_or_else(AppError::detection_not_found)?;

    Ok(Json(CommentAdded { detection_id: id, comment, total_comments }))
}

fn build_comment(text: &str, user: &UserContext) -> AppResult<Comment> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("Comment text is required", "MISSING_COMMENT"));
    }
    if text.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::bad_request(
            format!("Comments are limited to {} characters", MAX_COMMENT_LENGTH),
            "COMMENT_TOO_LONG",
        ));
    }

    Ok(Comment {
        id: Uuid::new_v4(),
        comment: text.to_string(),
        user_id: user.user_id,
        user_name: user.display_name(),
        timestamp: Utc::now(),
    })
}

/// Threat analysis of a stored detection
pub async fn threat_analysis(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Json<ThreatAnalysisResponse>> {
    require_clearance(&user, Clearance::Operator)?;
    let detection = Detection::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(AppError::detection_not_found)?;

    let object_type = detection.object_type().ok_or_else(|| {
        AppError::Internal(format!("detection {} has unknown object type '{}'", id, detection.object_type))
    })?;
    let threat_level = ThreatLevel::try_from(detection.threat_level).map_err(|level| {
        AppError::Internal(format!("detection {} has out-of-range threat level {}", id, level))
    })?;

    let analysis = analyze(object_type, detection.confidence, threat_level, detection.timestamp);
    let context = AnalysisContext {
        device_type: detection.metadata_str("device_type").unwrap_or("Unknown").to_string(),
        location: detection.metadata_str("location").unwrap_or("Unknown").to_string(),
        system_metrics: detection.system_metrics,
    };

    Ok(Json(ThreatAnalysisResponse { detection_id: id, analysis, context }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user() -> UserContext {
        UserContext { user_id: Uuid::new_v4(), email: None, role: None }
    }

    #[test]
    fn test_filter_validation() {
        let ok = DetectionFilter {
            object_type: Some("rifle".into()),
            entry_type: Some("manual".into()),
            min_threat_level: Some(7),
            ..Default::default()
        };
        assert!(validate_filter(&ok).is_ok());

        let bad_type = DetectionFilter { object_type: Some("Rifle".into()), ..Default::default() };
        assert_eq!(validate_filter(&bad_type).unwrap_err().code(), "INVALID_WEAPON_TYPE");

        let bad_entry = DetectionFilter { entry_type: Some("robot".into()), ..Default::default() };
        assert_eq!(validate_filter(&bad_entry).unwrap_err().code(), "INVALID_ENTRY_TYPE");

        let bad_level = DetectionFilter { min_threat_level: Some(11), ..Default::default() };
        assert_eq!(validate_filter(&bad_level).unwrap_err().code(), "INVALID_THREAT_LEVEL");
    }

    #[test]
    fn test_build_comment() {
        let u = user();
        let c = build_comment("  suspect left via north exit ", &u).unwrap();
        assert_eq!(c.comment, "suspect left via north exit");
        assert_eq!(c.user_id, u.user_id);
        assert_eq!(c.user_name, u.user_id.to_string());

        assert_eq!(build_comment("   ", &u).unwrap_err().code(), "MISSING_COMMENT");
        let long = "a".repeat(MAX_COMMENT_LENGTH + 1);
        assert_eq!(build_comment(&long, &u).unwrap_err().code(), "COMMENT_TOO_LONG");
    }

    #[test]
    fn test_weapon_details() {
        let detection = Detection {
            id: 3,
            object_category: "weapon".into(),
            object_type: "Knife".into(),
            confidence: 0.55,
            threat_level: 3,
            bounding_box: None,
            timestamp: Utc::now(),
            metadata: json!({ "device_type": "raspberry_pi" }),
            system_metrics: None,
            frame_metadata: None,
            created_at: Utc::now(),
            has_frame: false,
        };
        let details = weapon_details(&detection);
        assert_eq!(details.threat_assessment, "Low");
        assert_eq!(details.confidence_level, "Medium");
        assert_eq!(details.detection_method, "raspberry_pi");
    }
}
