//! Manual detection handlers
//!
//! Officers record sightings by hand. Entries go through the same
//! classifier and alert path as device detections.

use axum::{extract::{State, Query}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use arcis_core::threat::classify;

use crate::{AppState, AppResult};
use crate::ingest;
use crate::models::{BoundingBox, Detection, DetectionFilter, NewDetection, MANUAL_ENTRY};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

pub const MANUAL_DEVICE_TYPE: &str = "manual_entry";

pub const UNKNOWN_OFFICER: &str = "Unknown Officer";

#[derive(Debug, Deserialize, Validate)]
pub struct CreateManualDetectionRequest {
    #[validate(length(min = 1, max = 20))]
    pub object_type: String,
    pub confidence: f64,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    pub description: Option<String>,
    pub officer_id: Option<Value>,
    #[validate(length(max = 255))]
    pub officer_name: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    #[validate(nested)]
    pub bounding_box: Option<BoundingBox>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ManualQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ManualEntryView {
    pub id: i64,
    pub weapon_type: String,
    /// Percent, 0..=100
    pub confidence: u32,
    pub threat_level: i16,
    pub location: String,
    pub officer_name: String,
    pub officer_id: Option<Value>,
    pub description: String,
    pub notes: String,
    pub entry_timestamp: Option<Value>,
    pub original_timestamp: Option<Value>,
    pub timestamp: DateTime<Utc>,
    pub bounding_box: Option<BoundingBox>,
    pub comments: Value,
    pub entry_type: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ManualCreated {
    pub detection_id: i64,
    pub weapon_type: String,
    pub threat_level: u8,
    pub confidence: u32,
    pub location: String,
    pub officer_id: Option<Value>,
    pub officer: String,
    pub entry_type: &'static str,
    pub alert_created: bool,
}

/// List manual entries, newest first
pub async fn list(
    State(state): State<AppState>,
    user: UserContext,
    Query(query): Query<ManualQuery>,
) -> AppResult<Json<Vec<ManualEntryView>>> {
    require_clearance(&user, Clearance::Operator)?;
    let filter = DetectionFilter {
        limit: query.limit,
        offset: query.offset,
        entry_type: Some(MANUAL_ENTRY.to_string()),
        ..Default::default()
    };

    let entries = Detection::list(&state.pool, &filter)
        .await?
        .iter()
        .map(ManualEntryView::from_detection)
        .collect();

    Ok(Json(entries))
}

/// Record a manual entry
pub async fn create(
    State(state): State<AppState>,
    user: UserContext,
    Json(req): Json<CreateManualDetectionRequest>,
) -> AppResult<(StatusCode, Json<ManualCreated>)> {
    require_clearance(&user, Clearance::Operator)?;
    let new = prepare_manual(&req, &user, Utc::now())?;
    let classification = new.classification;
    let mut conn = state.pool.acquire().await?;
    let outcome = ingest::persist(&mut conn, new).await?;

    tracing::info!(
        detection_id = outcome.detection.id,
        user_id = %user.user_id,
        location = %req.location,
        "Manual detection recorded"
    );

    Ok((StatusCode::CREATED, Json(ManualCreated {
        detection_id: outcome.detection.id,
        weapon_type: classification.object_type.to_string(),
        threat_level: classification.threat_level.value(),
        confidence: classification.confidence_percent(),
        location: req.location,
        officer_id: req.officer_id,
        officer: req.officer_name.unwrap_or_else(|| UNKNOWN_OFFICER.to_string()),
        entry_type: MANUAL_ENTRY,
        alert_created: outcome.alert_created,
    })))
}

fn prepare_manual(
    req: &CreateManualDetectionRequest,
    user: &UserContext,
    now: DateTime<Utc>,
) -> AppResult<NewDetection> {
    req.validate()?;
    let classification = classify(&req.object_type, req.confidence)?;

    let metadata = json!({
        "device_type": MANUAL_DEVICE_TYPE,
        "entry_type": MANUAL_ENTRY,
        "officer_id": req.officer_id,
        "officer_name": req.officer_name.as_deref().unwrap_or(UNKNOWN_OFFICER),
        "location": req.location,
        "description": req.description.as_deref().unwrap_or(""),
        "notes": req.notes.as_deref().unwrap_or(""),
        "entry_timestamp": now,
        "original_timestamp": req.timestamp.unwrap_or(now),
        "comments": [],
        "entered_by": user.user_id,
    });

    Ok(NewDetection {
        classification,
        bounding_box: req.bounding_box,
        timestamp: now,
        metadata,
        system_metrics: None,
        frame: None,
    })
}

impl ManualEntryView {
    fn from_detection(detection: &Detection) -> Self {
        let text = |key: &str, fallback: &str| detection.metadata_str(key).unwrap_or(fallback).to_string();
        let field = |key: &str| detection.metadata.get(key).filter(|v| !v.is_null()).cloned();

        Self {
            id: detection.id,
            weapon_type: detection.object_type.clone(),
            confidence: (detection.confidence * 100.0).round() as u32,
            threat_level: detection.threat_level,
            location: text("location", "Unknown"),
            officer_name: text("officer_name", UNKNOWN_OFFICER),
            officer_id: field("officer_id"),
            description: text("description", ""),
            notes: text("notes", ""),
            entry_timestamp: field("entry_timestamp"),
            original_timestamp: field("original_timestamp"),
            timestamp: detection.timestamp,
            bounding_box: detection.bounding_box.as_ref().map(|b| b.0),
            comments: field("comments").unwrap_or_else(|| json!([])),
            entry_type: MANUAL_ENTRY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user() -> UserContext {
        UserContext { user_id: Uuid::new_v4(), email: Some("officer@arcis.test".into()), role: None }
    }

    fn request(body: Value) -> CreateManualDetectionRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_prepare_manual_metadata() {
        let u = user();
        let now = Utc::now();
        let req = request(json!({
            "object_type": "Pistol",
            "confidence": 0.9,
            "location": "Platform 4",
            "officer_id": "B-117"
        }));

        let new = prepare_manual(&req, &u, now).unwrap();
        assert_eq!(new.classification.threat_level.value(), 7);
        assert!(new.frame.is_none());
        assert!(new.bounding_box.is_none());
        assert_eq!(new.metadata["entry_type"], "manual");
        assert_eq!(new.metadata["device_type"], MANUAL_DEVICE_TYPE);
        assert_eq!(new.metadata["officer_name"], UNKNOWN_OFFICER);
        assert_eq!(new.metadata["officer_id"], "B-117");
        assert_eq!(new.metadata["comments"], json!([]));
        assert_eq!(new.metadata["entered_by"], json!(u.user_id));
    }

    #[test]
    fn test_prepare_manual_rejects() {
        let req = request(json!({ "object_type": "Pistol", "confidence": 0.9, "location": "" }));
        assert_eq!(prepare_manual(&req, &user(), Utc::now()).unwrap_err().code(), "VALIDATION_ERROR");

        let req = request(json!({ "object_type": "bat", "confidence": 0.9, "location": "Lobby" }));
        assert_eq!(prepare_manual(&req, &user(), Utc::now()).unwrap_err().code(), "INVALID_WEAPON_TYPE");

        let req = request(json!({ "object_type": "Knife", "confidence": -0.1, "location": "Lobby" }));
        assert_eq!(prepare_manual(&req, &user(), Utc::now()).unwrap_err().code(), "INVALID_CONFIDENCE");
    }

    #[test]
    fn test_entry_view() {
        let detection = Detection {
            id: 12,
            object_category: "weapon".into(),
            object_type: "Knife".into(),
            confidence: 0.456,
            threat_level: 3,
            bounding_box: None,
            timestamp: Utc::now(),
            metadata: json!({ "entry_type": "manual", "location": "Gate 2", "officer_id": null }),
            system_metrics: None,
            frame_metadata: None,
            created_at: Utc::now(),
            has_frame: false,
        };

        let view = ManualEntryView::from_detection(&detection);
        assert_eq!(view.confidence, 46);
        assert_eq!(view.location, "Gate 2");
        assert_eq!(view.officer_name, UNKNOWN_OFFICER);
        assert!(view.officer_id.is_none());
        assert_eq!(view.comments, json!([]));
    }
}
