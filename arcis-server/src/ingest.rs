//! Detection ingestion pipeline
//!
//! classify -> persist -> alert. Everything that can reject a request runs
//! before the first write, so a rejected request never touches the database.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::{Connection, PgConnection};
use validator::Validate;

use arcis_core::threat::{classify, plan_alert, Classification};

use crate::models::{
    resolve_frame_source, Alert, CreateDetectionRequest, Detection, FrameStorage, NewDetection,
    DEVICE_ENTRY,
};
use crate::{AppError, AppResult};

/// A persisted detection and whether its alert was written
#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    #[serde(flatten)]
    pub detection: Detection,
    pub alert_created: bool,
}

/// Validate and classify a device request without persisting it
pub fn prepare_device_detection(
    req: CreateDetectionRequest,
    extra_metadata: Map<String, Value>,
) -> AppResult<NewDetection> {
    req.validate()?;

    let classification = classify(&req.object_type, req.confidence)?;
    let frame = resolve_frame_source(
        req.frame_data.as_ref(),
        req.frame_url.as_deref(),
        FrameStorage::AsReceived,
    )?;

    let mut metadata = metadata_object(req.metadata)?;
    for (key, value) in extra_metadata {
        metadata.entry(key).or_insert(value);
    }
    metadata.insert("entry_type".to_string(), Value::from(DEVICE_ENTRY));

    Ok(NewDetection {
        classification,
        bounding_box: Some(req.bounding_box),
        timestamp: req.timestamp.unwrap_or_else(Utc::now),
        metadata: Value::Object(metadata),
        system_metrics: req.system_metrics,
        frame,
    })
}

/// Persist a prepared detection and raise its alert, if any.
///
/// A failed alert insert does not undo the detection; it is logged and
/// reported through `alert_created`.
pub async fn persist(conn: &mut PgConnection, new: NewDetection) -> AppResult<IngestOutcome> {
    let classification = new.classification;
    let detection = Detection::create(conn, new).await?;

    tracing::info!(
        detection_id = detection.id,
        object_type = %classification.object_type,
        threat_level = classification.threat_level.value(),
        "Detection stored"
    );

    let alert_created = raise_alert(conn, detection.id, &classification).await;

    Ok(IngestOutcome { detection, alert_created })
}

/// Exactly one insert per alert-worthy classification, none otherwise.
///
/// The insert runs in its own savepoint so a failure leaves an enclosing
/// transaction usable.
async fn raise_alert(conn: &mut PgConnection, detection_id: i64, classification: &Classification) -> bool {
    let Some(plan) = plan_alert(classification) else {
        return false;
    };

    let inserted = async {
        let mut savepoint = conn.begin().await?;
        let alert = Alert::create_for_detection(&mut savepoint, detection_id, &plan).await?;
        savepoint.commit().await?;
        Ok::<_, sqlx::Error>(alert)
    }
    .await;

    match inserted {
        Ok(alert) => {
            tracing::warn!(
                alert_id = alert.id,
                detection_id,
                severity = plan.severity.value(),
                "{}",
                plan.action_required
            );
            true
        }
        Err(err) => {
            tracing::warn!(detection_id, "Alert insert failed after detection was stored: {}", err);
            false
        }
    }
}

/// Client metadata must be a JSON object when present
pub fn metadata_object(metadata: Option<Value>) -> AppResult<Map<String, Value>> {
    match metadata {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::bad_request("metadata must be a JSON object", "INVALID_METADATA")),
    }
}
