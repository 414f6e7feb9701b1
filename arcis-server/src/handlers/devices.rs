//! Device handlers
//!
//! Edge devices (Jetson, Raspberry Pi, generic detectors) push detections
//! here with an `X-API-Key`.

use axum::{extract::{State, Path}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use validator::Validate;

use arcis_core::threat::{classify_typed, ObjectType};

use crate::{AppState, AppResult, AppError};
use crate::ingest::{self, IngestOutcome};
use crate::middleware::auth::DeviceContext;
use crate::models::{
    resolve_frame_source, BoundingBox, CreateDetectionRequest, Detection, FrameStorage, NewDetection,
    DEVICE_ENTRY,
};

pub const MAX_BATCH_SIZE: usize = 500;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub detections: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub processed: usize,
    pub errors: usize,
    pub data: Vec<IngestOutcome>,
    pub error_details: Vec<BatchItemError>,
}

#[derive(Debug, Serialize)]
pub struct BatchItemError {
    pub index: usize,
    pub error: String,
    pub code: &'static str,
}

/// Jetson Nano payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JetsonPayload {
    pub detected_objects: Vec<JetsonObject>,
    pub frame: Option<Value>,
    pub system_metrics: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
    pub device_id: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JetsonObject {
    /// YOLO class id or class name
    pub class: Option<Value>,
    pub label: Option<String>,
    pub confidence: f64,
    /// `[x, y, w, h]`
    pub bbox: [f64; 4],
}

/// Raspberry Pi payload carrying Google Cloud Vision object results
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaspberryPayload {
    /// Array of results, or the same array as a JSON string
    pub cloud_vision_results: Value,
    #[serde(rename = "frame_data", alias = "frameData")]
    pub frame_data: Option<Value>,
    pub system_metrics: Option<Value>,
    pub timestamp: Option<DateTime<Utc>>,
    pub device_id: String,
    pub device_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionObject {
    #[serde(alias = "name")]
    pub description: String,
    pub score: f64,
    pub bounding_poly: BoundingPoly,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingPoly {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vertices: Vec<Vertex>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalized_vertices: Vec<Vertex>,
}

/// Cloud Vision omits zero coordinates
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
}

impl BoundingPoly {
    /// Pixel vertices when present, normalized ones otherwise
    fn bounding_box(&self) -> Option<BoundingBox> {
        let vertices = if self.vertices.is_empty() { &self.normalized_vertices } else { &self.vertices };
        let points: Vec<(f64, f64)> = vertices.iter().map(|v| (v.x, v.y)).collect();
        BoundingBox::from_vertices(&points)
    }
}

/// Summary returned for a multi-object device report
#[derive(Debug, Serialize)]
pub struct DeviceReportResponse {
    pub device_id: String,
    pub processed: usize,
    pub skipped: usize,
    pub alerts_created: usize,
    pub detections: Vec<IngestOutcome>,
}

#[derive(Debug, Deserialize)]
pub struct FrameBackfillRequest {
    pub frame_data: Option<Value>,
    pub frame_url: Option<String>,
}

/// Ingest one detection
pub async fn create_detection(
    State(state): State<AppState>,
    device: DeviceContext,
    Json(req): Json<CreateDetectionRequest>,
) -> AppResult<(StatusCode, Json<IngestOutcome>)> {
    let new = ingest::prepare_device_detection(req, device_metadata(&device))?;
    let mut conn = state.pool.acquire().await?;
    let outcome = ingest::persist(&mut conn, new).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Ingest a batch; each item succeeds or fails on its own
pub async fn create_batch(
    State(state): State<AppState>,
    device: DeviceContext,
    Json(req): Json<BatchRequest>,
) -> AppResult<Json<BatchResponse>> {
    if req.detections.is_empty() {
        return Err(AppError::bad_request("Provide a non-empty detections array", "INVALID_BATCH_FORMAT"));
    }
    if req.detections.len() > MAX_BATCH_SIZE {
        return Err(AppError::bad_request(
            format!("At most {} detections per batch", MAX_BATCH_SIZE),
            "BATCH_TOO_LARGE",
        ));
    }

    let mut data = Vec::new();
    let mut error_details = Vec::new();

    for (index, item) in req.detections.into_iter().enumerate() {
        match ingest_item(&state, &device, item).await {
            Ok(outcome) => data.push(outcome),
            Err(err) => {
                tracing::debug!(index, "Batch item rejected: {}", err);
                error_details.push(BatchItemError {
                    index,
                    error: err.public_message(),
                    code: err.code(),
                });
            }
        }
    }

    tracing::info!(processed = data.len(), errors = error_details.len(), "Batch processed");

    Ok(Json(BatchResponse {
        processed: data.len(),
        errors: error_details.len(),
        data,
        error_details,
    }))
}

async fn ingest_item(state: &AppState, device: &DeviceContext, item: Value) -> AppResult<IngestOutcome> {
    let req: CreateDetectionRequest = serde_json::from_value(item)
        .map_err(|e| AppError::bad_request(format!("Malformed detection: {}", e), "INVALID_DETECTION"))?;
    let new = ingest::prepare_device_detection(req, device_metadata(device))?;
    let mut conn = state.pool.acquire().await?;
    ingest::persist(&mut conn, new).await
}

/// Ingest a Jetson Nano report. Non-weapon objects are skipped.
pub async fn jetson(
    State(state): State<AppState>,
    device: DeviceContext,
    Json(payload): Json<JetsonPayload>,
) -> AppResult<(StatusCode, Json<DeviceReportResponse>)> {
    let device_id = report_device_id(&payload.device_id)?;
    if payload.detected_objects.is_empty() {
        return Err(AppError::bad_request("No detected objects provided", "NO_OBJECTS"));
    }

    let prepared = prepare_jetson(&payload, &device_id, &device)?;
    let skipped = payload.detected_objects.len() - prepared.len();
    let response = persist_report(&state, device_id, prepared, skipped).await?;

    tracing::info!(
        device_id = %response.device_id,
        processed = response.processed,
        skipped,
        alerts_created = response.alerts_created,
        "Jetson report processed"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

/// Ingest a Raspberry Pi report of Cloud Vision results.
/// Non-weapon results are skipped.
pub async fn raspberry(
    State(state): State<AppState>,
    device: DeviceContext,
    Json(payload): Json<RaspberryPayload>,
) -> AppResult<(StatusCode, Json<DeviceReportResponse>)> {
    let device_id = report_device_id(&payload.device_id)?;
    let results = vision_results(&payload.cloud_vision_results)?;

    let prepared = prepare_raspberry(&payload, &results, &device_id, &device)?;
    let skipped = results.len() - prepared.len();
    let response = persist_report(&state, device_id, prepared, skipped).await?;

    tracing::info!(
        device_id = %response.device_id,
        processed = response.processed,
        skipped,
        alerts_created = response.alerts_created,
        "Raspberry Pi report processed"
    );
    Ok((StatusCode::CREATED, Json(response)))
}

fn report_device_id(raw: &str) -> AppResult<String> {
    let device_id = raw.trim();
    if device_id.is_empty() {
        return Err(AppError::bad_request("deviceId is required", "MISSING_DEVICE_ID"));
    }
    Ok(device_id.to_string())
}

/// Store a whole report in one transaction: all of it or none of it.
/// A report with nothing to store never opens one.
async fn persist_report(
    state: &AppState,
    device_id: String,
    prepared: Vec<NewDetection>,
    skipped: usize,
) -> AppResult<DeviceReportResponse> {
    let mut detections = Vec::with_capacity(prepared.len());
    if !prepared.is_empty() {
        let mut tx = state.pool.begin().await?;
        for new in prepared {
            detections.push(ingest::persist(&mut tx, new).await?);
        }
        tx.commit().await?;
    }

    Ok(DeviceReportResponse {
        device_id,
        processed: detections.len(),
        skipped,
        alerts_created: detections.iter().filter(|d| d.alert_created).count(),
        detections,
    })
}

/// Map, classify and validate every weapon object before anything is written
fn prepare_jetson(
    payload: &JetsonPayload,
    device_id: &str,
    device: &DeviceContext,
) -> AppResult<Vec<NewDetection>> {
    let mut prepared = Vec::new();
    let mut frame = None;

    for object in &payload.detected_objects {
        let (class_id, class_name) = match &object.class {
            Some(Value::Number(n)) => (n.as_u64(), None),
            Some(Value::String(s)) => (None, Some(s.as_str())),
            _ => (None, None),
        };

        let Some(object_type) = ObjectType::from_detector(class_id, class_name, object.label.as_deref()) else {
            continue;
        };

        let classification = classify_typed(object_type, object.confidence)?;
        let bounding_box = BoundingBox::from_xywh(object.bbox);
        bounding_box.validate()?;

        // One frame per report, decoded once and shared by its detections
        if frame.is_none() {
            frame = Some(resolve_frame_source(payload.frame.as_ref(), None, FrameStorage::AsReceived)?);
        }

        let mut metadata = device_metadata(device);
        metadata.insert("entry_type".into(), json!(DEVICE_ENTRY));
        metadata.insert("device_type".into(), json!("jetson_nano"));
        metadata.insert("device_id".into(), json!(device_id));
        metadata.insert("device_name".into(), json!(payload.device_name.as_deref().unwrap_or("Jetson Nano")));
        metadata.insert("original_class".into(), object.class.clone().unwrap_or(Value::Null));
        metadata.insert("original_label".into(), json!(object.label));

        prepared.push(NewDetection {
            classification,
            bounding_box: Some(bounding_box),
            timestamp: payload.timestamp.unwrap_or_else(Utc::now),
            metadata: Value::Object(metadata),
            system_metrics: payload.system_metrics.clone(),
            frame: frame.clone().flatten(),
        });
    }

    Ok(prepared)
}

/// Cloud Vision results may arrive as an array or as a JSON-encoded string
fn vision_results(raw: &Value) -> AppResult<Vec<VisionObject>> {
    let invalid = |e: serde_json::Error| {
        AppError::bad_request(format!("Malformed cloudVisionResults: {}", e), "INVALID_VISION_RESULTS")
    };
    match raw {
        Value::String(text) => serde_json::from_str(text).map_err(invalid),
        other => Vec::<VisionObject>::deserialize(other).map_err(invalid),
    }
}

fn prepare_raspberry(
    payload: &RaspberryPayload,
    results: &[VisionObject],
    device_id: &str,
    device: &DeviceContext,
) -> AppResult<Vec<NewDetection>> {
    let mut prepared = Vec::new();
    let mut frame = None;

    for result in results {
        let Some(object_type) = ObjectType::from_cloud_vision(&result.description) else {
            continue;
        };

        let classification = classify_typed(object_type, result.score)?;
        let bounding_box = result
            .bounding_poly
            .bounding_box()
            .ok_or_else(|| AppError::bad_request("boundingPoly has no vertices", "INVALID_BOUNDING_POLY"))?;
        bounding_box.validate()?;

        // Pi frames are uploaded JPEGs; keep them as binary
        if frame.is_none() {
            frame = Some(resolve_frame_source(payload.frame_data.as_ref(), None, FrameStorage::Binary)?);
        }

        let mut metadata = device_metadata(device);
        metadata.insert("entry_type".into(), json!(DEVICE_ENTRY));
        metadata.insert("device_type".into(), json!("raspberry_pi"));
        metadata.insert("device_id".into(), json!(device_id));
        metadata.insert("device_name".into(), json!(payload.device_name.as_deref().unwrap_or("Raspberry Pi")));
        metadata.insert("cloud_vision_description".into(), json!(result.description));
        metadata.insert("bounding_poly".into(), json!(result.bounding_poly));

        prepared.push(NewDetection {
            classification,
            bounding_box: Some(bounding_box),
            timestamp: payload.timestamp.unwrap_or_else(Utc::now),
            metadata: Value::Object(metadata),
            system_metrics: payload.system_metrics.clone(),
            frame: frame.clone().flatten(),
        });
    }

    Ok(prepared)
}

/// Attach a frame to a detection stored without one
pub async fn attach_frame(
    State(state): State<AppState>,
    _device: DeviceContext,
    Path(id): Path<i64>,
    Json(req): Json<FrameBackfillRequest>,
) -> AppResult<Json<Detection>> {
    let upload = resolve_frame_source(req.frame_data.as_ref(), req.frame_url.as_deref(), FrameStorage::Binary)?
        .ok_or_else(|| AppError::bad_request("Provide frame_data or frame_url", "MISSING_FRAME"))?;

    if let Some(detection) = Detection::attach_frame(&state.pool, id, &upload).await? {
        tracing::info!(detection_id = id, "Frame attached");
        return Ok(Json(detection));
    }

    if Detection::exists(&state.pool, id).await? {
        Err(AppError::conflict("Detection already has a frame", "FRAME_ALREADY_SET"))
    } else {
        Err(AppError::detection_not_found())
    }
}

fn device_metadata(device: &DeviceContext) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("device_key".into(), json!(device.key_hint));
    if let Some(ip) = &device.ip_address {
        metadata.insert("source_ip".into(), json!(ip));
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredFrame;

    fn device() -> DeviceContext {
        DeviceContext { key_hint: "...1234".to_string(), ip_address: None }
    }

    fn payload(objects: Value) -> JetsonPayload {
        serde_json::from_value(json!({
            "detectedObjects": objects,
            "deviceId": "jetson-01",
            "timestamp": "2024-05-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_jetson_skips_non_weapons() {
        let p = payload(json!([
            { "class": "person", "label": "person", "confidence": 0.99, "bbox": [0, 0, 10, 10] },
            { "class": 2, "label": "rifle", "confidence": 0.95, "bbox": [5, 5, 20, 40] },
            { "class": "gun", "confidence": 0.5, "bbox": [1, 1, 2, 2] }
        ]));

        let prepared = prepare_jetson(&p, "jetson-01", &device()).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].classification.object_type, ObjectType::Rifle);
        assert_eq!(prepared[0].classification.threat_level.value(), 10);
        assert_eq!(prepared[1].classification.object_type, ObjectType::Pistol);
        assert_eq!(prepared[0].metadata["device_type"], "jetson_nano");
        assert_eq!(prepared[0].metadata["original_class"], 2);
    }

    #[test]
    fn test_jetson_rejects_bad_confidence_before_writes() {
        let p = payload(json!([
            { "class": 1, "confidence": 0.9, "bbox": [0, 0, 1, 1] },
            { "class": 3, "confidence": 1.7, "bbox": [0, 0, 1, 1] }
        ]));
        let err = prepare_jetson(&p, "jetson-01", &device()).unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIDENCE");
    }

    #[test]
    fn test_jetson_rejects_negative_bbox() {
        let p = payload(json!([{ "class": 0, "confidence": 0.9, "bbox": [-1, 0, 1, 1] }]));
        let err = prepare_jetson(&p, "jetson-01", &device()).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_jetson_frame_shared() {
        let mut p = payload(json!([
            { "class": 1, "confidence": 0.9, "bbox": [0, 0, 1, 1] },
            { "class": 3, "confidence": 0.9, "bbox": [0, 0, 1, 1] }
        ]));
        p.frame = Some(json!({ "type": "Buffer", "data": [255, 216, 255, 217] }));

        let prepared = prepare_jetson(&p, "jetson-01", &device()).unwrap();
        assert!(prepared.iter().all(|d| d.frame.is_some()));
    }

    fn raspberry(results: Value) -> RaspberryPayload {
        serde_json::from_value(json!({
            "cloudVisionResults": results,
            "deviceId": "pi-03",
        }))
        .unwrap()
    }

    fn vision(description: &str, score: f64) -> Value {
        json!({
            "description": description,
            "score": score,
            "boundingPoly": { "vertices": [
                { "x": 10, "y": 20 }, { "x": 60, "y": 20 }, { "x": 60, "y": 100 }, { "x": 10, "y": 100 }
            ] }
        })
    }

    #[test]
    fn test_raspberry_maps_vision_results() {
        let p = raspberry(json!([vision("Handgun", 0.91), vision("Person", 0.99), vision("Assault rifle", 0.8)]));
        let results = vision_results(&p.cloud_vision_results).unwrap();

        let prepared = prepare_raspberry(&p, &results, "pi-03", &device()).unwrap();
        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].classification.object_type, ObjectType::Pistol);
        assert_eq!(prepared[1].classification.object_type, ObjectType::Rifle);
        assert_eq!(
            prepared[0].bounding_box,
            Some(BoundingBox { x: 10.0, y: 20.0, width: 50.0, height: 80.0 })
        );
        assert_eq!(prepared[0].metadata["device_type"], "raspberry_pi");
        assert_eq!(prepared[0].metadata["device_id"], "pi-03");
        assert_eq!(prepared[0].metadata["cloud_vision_description"], "Handgun");
        assert!(prepared[0].frame.is_none());
    }

    #[test]
    fn test_raspberry_results_as_string() {
        let encoded = serde_json::to_string(&json!([vision("Kitchen knife", 0.7)])).unwrap();
        let p = raspberry(json!(encoded));
        let results = vision_results(&p.cloud_vision_results).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "Kitchen knife");

        assert_eq!(
            vision_results(&json!("not json")).unwrap_err().code(),
            "INVALID_VISION_RESULTS"
        );
    }

    #[test]
    fn test_raspberry_normalized_vertices() {
        let p = raspberry(json!([{
            "name": "Knife",
            "score": 0.8,
            "boundingPoly": { "normalizedVertices": [{ "x": 0.25 }, { "x": 0.5, "y": 0.75 }] }
        }]));
        let results = vision_results(&p.cloud_vision_results).unwrap();
        let prepared = prepare_raspberry(&p, &results, "pi-03", &device()).unwrap();
        assert_eq!(
            prepared[0].bounding_box,
            Some(BoundingBox { x: 0.25, y: 0.0, width: 0.25, height: 0.75 })
        );
    }

    #[test]
    fn test_raspberry_rejects_empty_poly() {
        let p = raspberry(json!([{ "description": "Pistol", "score": 0.9, "boundingPoly": {} }]));
        let results = vision_results(&p.cloud_vision_results).unwrap();
        let err = prepare_raspberry(&p, &results, "pi-03", &device()).unwrap_err();
        assert_eq!(err.code(), "INVALID_BOUNDING_POLY");
    }

    #[test]
    fn test_raspberry_frame_stored_binary() {
        let mut p = raspberry(json!([vision("Pistol", 0.9)]));
        p.frame_data = Some(json!({ "type": "Buffer", "data": [255, 216, 255, 217] }));
        let results = vision_results(&p.cloud_vision_results).unwrap();
        let prepared = prepare_raspberry(&p, &results, "pi-03", &device()).unwrap();
        let upload = prepared[0].frame.as_ref().unwrap();
        assert_eq!(upload.frame, StoredFrame::Jpeg(vec![255, 216, 255, 217]));
    }

    #[test]
    fn test_report_device_id() {
        assert_eq!(report_device_id("  pi-03 ").unwrap(), "pi-03");
        assert_eq!(report_device_id(" ").unwrap_err().code(), "MISSING_DEVICE_ID");
    }

    #[test]
    fn test_device_metadata() {
        let ctx = DeviceContext { key_hint: "...abcd".into(), ip_address: Some("10.0.0.5".into()) };
        let meta = device_metadata(&ctx);
        assert_eq!(meta["device_key"], "...abcd");
        assert_eq!(meta["source_ip"], "10.0.0.5");
    }
}
