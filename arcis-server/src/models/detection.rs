//! Detection model

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow, PgConnection, PgPool};
use validator::Validate;

use arcis_core::threat::{Classification, ObjectType};

use super::frame::{FrameRow, FrameUpload};
use super::page;

/// Every ingested detection is a weapon detection
pub const WEAPON_CATEGORY: &str = "weapon";

pub const MANUAL_ENTRY: &str = "manual";

pub const DEVICE_ENTRY: &str = "device";

/// Row columns without the frame payload
const DETECTION_COLUMNS: &str = r#"
    id, object_category, object_type, confidence, threat_level, bounding_box,
    timestamp, metadata, system_metrics, frame_metadata, created_at,
    num_nonnulls(frame_data, frame_jpeg, frame_url) > 0 AS has_frame
"#;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Detection {
    pub id: i64,
    pub object_category: String,
    pub object_type: String,
    pub confidence: f64,
    pub threat_level: i16,
    pub bounding_box: Option<Json<BoundingBox>>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
    pub system_metrics: Option<Value>,
    pub frame_metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub has_frame: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct BoundingBox {
    #[validate(range(min = 0.0))]
    pub x: f64,
    #[validate(range(min = 0.0))]
    pub y: f64,
    #[validate(range(min = 0.0))]
    pub width: f64,
    #[validate(range(min = 0.0))]
    pub height: f64,
}

impl BoundingBox {
    /// From a detector's `[x, y, w, h]`
    pub fn from_xywh(bbox: [f64; 4]) -> Self {
        Self { x: bbox[0], y: bbox[1], width: bbox[2], height: bbox[3] }
    }

    /// Axis-aligned box around polygon vertices; `None` without vertices
    pub fn from_vertices(vertices: &[(f64, f64)]) -> Option<Self> {
        let (&(x0, y0), rest) = vertices.split_first()?;
        let (min_x, min_y, max_x, max_y) = rest.iter().fold((x0, y0, x0, y0), |(lx, ly, hx, hy), &(x, y)| {
            (lx.min(x), ly.min(y), hx.max(x), hy.max(y))
        });
        Some(Self { x: min_x, y: min_y, width: max_x - min_x, height: max_y - min_y })
    }
}

/// Device ingestion body
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDetectionRequest {
    #[validate(length(min = 1, max = 20))]
    pub object_type: String,
    pub confidence: f64,
    #[validate(nested)]
    pub bounding_box: BoundingBox,
    pub timestamp: Option<DateTime<Utc>>,
    pub metadata: Option<Value>,
    pub system_metrics: Option<Value>,
    /// Any supported frame encoding
    pub frame_data: Option<Value>,
    #[validate(length(min = 1, max = 2048))]
    pub frame_url: Option<String>,
}

/// Fully validated row to insert. The threat level comes from the classifier.
#[derive(Debug, Clone)]
pub struct NewDetection {
    pub classification: Classification,
    pub bounding_box: Option<BoundingBox>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Value,
    pub system_metrics: Option<Value>,
    pub frame: Option<FrameUpload>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DetectionFilter {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub min_threat_level: Option<i16>,
    pub object_type: Option<String>,
    /// `manual` or `device`
    pub entry_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    pub comment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: uuid::Uuid,
    pub comment: String,
    pub user_id: uuid::Uuid,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Weapon counts used by the reports
#[derive(Debug, Default, Serialize)]
pub struct DetectionCounts {
    pub total: i64,
    pub by_weapon_type: BTreeMap<String, i64>,
    pub by_threat_level: BTreeMap<i16, i64>,
    pub recent_24h: i64,
}

impl Detection {
    pub fn object_type(&self) -> Option<ObjectType> {
        self.object_type.parse().ok()
    }

    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    /// Insert on a caller-owned connection, so batches can share a transaction
    pub async fn create(conn: &mut PgConnection, data: NewDetection) -> Result<Self, sqlx::Error> {
        let (frame_data, frame_jpeg, frame_url) = data
            .frame
            .as_ref()
            .map(|f| f.frame.columns())
            .unwrap_or((None, None, None));
        let frame_metadata = data.frame.as_ref().map(|f| &f.metadata);

        let sql = format!(
            r#"
            INSERT INTO detections
                (object_category, object_type, confidence, threat_level, bounding_box,
                 timestamp, metadata, system_metrics, frame_data, frame_jpeg, frame_url, frame_metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            DETECTION_COLUMNS
        );

        sqlx::query_as::<_, Detection>(&sql)
            .bind(WEAPON_CATEGORY)
            .bind(data.classification.object_type.as_str())
            .bind(data.classification.confidence)
            .bind(i16::from(data.classification.threat_level))
            .bind(data.bounding_box.map(Json))
            .bind(data.timestamp)
            .bind(&data.metadata)
            .bind(&data.system_metrics)
            .bind(frame_data)
            .bind(frame_jpeg)
            .bind(frame_url)
            .bind(frame_metadata)
            .fetch_one(conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {} FROM detections WHERE id = $1", DETECTION_COLUMNS);
        sqlx::query_as::<_, Detection>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &DetectionFilter) -> Result<Vec<Self>, sqlx::Error> {
        let (limit, offset) = page(filter.limit, filter.offset);
        let sql = format!(
            r#"
            SELECT {} FROM detections
            WHERE ($1::smallint IS NULL OR threat_level >= $1)
              AND ($2::text IS NULL OR object_type = $2)
              AND ($3::text IS NULL OR COALESCE(metadata->>'entry_type', 'device') = $3)
            ORDER BY timestamp DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
            DETECTION_COLUMNS
        );

        sqlx::query_as::<_, Detection>(&sql)
            .bind(filter.min_threat_level)
            .bind(&filter.object_type)
            .bind(&filter.entry_type)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Highest threats first
    pub async fn list_threats(
        pool: &PgPool,
        min_threat_level: i16,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {} FROM detections
            WHERE threat_level >= $1
            ORDER BY threat_level DESC, timestamp DESC
            LIMIT $2
            "#,
            DETECTION_COLUMNS
        );

        sqlx::query_as::<_, Detection>(&sql)
            .bind(min_threat_level)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("DELETE FROM detections WHERE id = $1 RETURNING {}", DETECTION_COLUMNS);
        sqlx::query_as::<_, Detection>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Delete every detection; alerts go with them
    pub async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM detections").execute(pool).await?;
        Ok(result.rows_affected())
    }

    /// Append to `metadata.comments`, returning the new comment count
    pub async fn add_comment(
        pool: &PgPool,
        id: i64,
        comment: &Comment,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE detections
            SET metadata = jsonb_set(
                metadata,
                '{comments}',
                COALESCE(metadata->'comments', '[]'::jsonb) || jsonb_build_array($2::jsonb)
            )
            WHERE id = $1
            RETURNING jsonb_array_length(metadata->'comments')
            "#
        )
        .bind(id)
        .bind(Json(comment))
        .fetch_optional(pool)
        .await
    }

    pub async fn frame(pool: &PgPool, id: i64) -> Result<Option<FrameRow>, sqlx::Error> {
        sqlx::query_as::<_, FrameRow>(
            "SELECT frame_data, frame_jpeg, frame_url, frame_metadata FROM detections WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Backfill a frame on a detection that has none.
    ///
    /// `None` when the detection is missing or already has a frame.
    pub async fn attach_frame(
        pool: &PgPool,
        id: i64,
        upload: &FrameUpload,
    ) -> Result<Option<Self>, sqlx::Error> {
        let (frame_data, frame_jpeg, frame_url) = upload.frame.columns();
        let sql = format!(
            r#"
            UPDATE detections
            SET frame_data = $2, frame_jpeg = $3, frame_url = $4, frame_metadata = $5
            WHERE id = $1 AND num_nonnulls(frame_data, frame_jpeg, frame_url) = 0
            RETURNING {}
            "#,
            DETECTION_COLUMNS
        );

        sqlx::query_as::<_, Detection>(&sql)
            .bind(id)
            .bind(frame_data)
            .bind(frame_jpeg)
            .bind(frame_url)
            .bind(&upload.metadata)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM detections WHERE id = $1)")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Totals, optionally restricted to one entry type
    pub async fn counts(pool: &PgPool, entry_type: Option<&str>) -> Result<DetectionCounts, sqlx::Error> {
        const ENTRY_FILTER: &str = "($1::text IS NULL OR COALESCE(metadata->>'entry_type', 'device') = $1)";

        let by_type = sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT object_type, COUNT(*) FROM detections WHERE {} GROUP BY object_type",
            ENTRY_FILTER
        ))
        .bind(entry_type)
        .fetch_all(pool)
        .await?;

        let by_level = sqlx::query_as::<_, (i16, i64)>(&format!(
            "SELECT threat_level, COUNT(*) FROM detections WHERE {} GROUP BY threat_level",
            ENTRY_FILTER
        ))
        .bind(entry_type)
        .fetch_all(pool)
        .await?;

        let recent_24h = sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM detections WHERE {} AND timestamp > NOW() - INTERVAL '24 hours'",
            ENTRY_FILTER
        ))
        .bind(entry_type)
        .fetch_one(pool)
        .await?;

        Ok(DetectionCounts {
            total: by_type.iter().map(|(_, n)| n).sum(),
            by_weapon_type: by_type.into_iter().collect(),
            by_threat_level: by_level.into_iter().collect(),
            recent_24h,
        })
    }

    /// Count manual entries grouped by a metadata field
    pub async fn count_manual_by(
        pool: &PgPool,
        field: &str,
        fallback: &str,
    ) -> Result<BTreeMap<String, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT COALESCE(NULLIF(metadata->>$1, ''), $2) AS key, COUNT(*)
            FROM detections
            WHERE metadata->>'entry_type' = 'manual'
            GROUP BY key
            "#
        )
        .bind(field)
        .bind(fallback)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    /// Detections per weapon type in the last 24 hours
    pub async fn recent_weapon_types(pool: &PgPool) -> Result<BTreeMap<String, i64>, sqlx::Error> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT object_type, COUNT(*) FROM detections
            WHERE timestamp > NOW() - INTERVAL '24 hours'
            GROUP BY object_type
            "#
        )
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_negative_bounding_box_rejected() {
        let bbox = BoundingBox { x: -1.0, y: 0.0, width: 10.0, height: 10.0 };
        assert!(bbox.validate().is_err());
        assert!(BoundingBox::from_xywh([1.0, 2.0, 3.0, 4.0]).validate().is_ok());
    }

    #[test]
    fn test_bounding_box_from_vertices() {
        let bbox = BoundingBox::from_vertices(&[(40.0, 10.0), (90.0, 12.0), (88.0, 70.0), (42.0, 65.0)]).unwrap();
        assert_eq!(bbox, BoundingBox { x: 40.0, y: 10.0, width: 50.0, height: 60.0 });
        assert!(BoundingBox::from_vertices(&[]).is_none());
    }

    #[test]
    fn test_request_validation_is_nested() {
        let req: CreateDetectionRequest = serde_json::from_value(json!({
            "object_type": "rifle",
            "confidence": 0.9,
            "bounding_box": { "x": 0, "y": 0, "width": -5, "height": 5 }
        }))
        .unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.errors().contains_key("bounding_box"));
    }

    #[test]
    fn test_frame_data_accepts_any_json_shape() {
        let req: CreateDetectionRequest = serde_json::from_value(json!({
            "object_type": "Knife",
            "confidence": 0.4,
            "bounding_box": { "x": 0, "y": 0, "width": 5, "height": 5 },
            "frame_data": { "type": "Buffer", "data": [255, 216] }
        }))
        .unwrap();
        assert!(req.frame_data.as_ref().unwrap().is_object());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_metadata_accessors() {
        let mut detection = Detection {
            id: 1,
            object_category: WEAPON_CATEGORY.to_string(),
            object_type: "Pistol".to_string(),
            confidence: 0.9,
            threat_level: 7,
            bounding_box: None,
            timestamp: Utc::now(),
            metadata: json!({}),
            system_metrics: None,
            frame_metadata: None,
            created_at: Utc::now(),
            has_frame: false,
        };
        assert_eq!(detection.object_type(), Some(ObjectType::Pistol));
        assert_eq!(detection.metadata_str("entry_type"), None);

        detection.metadata = json!({ "entry_type": "manual", "location": "Gate 3" });
        assert_eq!(detection.metadata_str("entry_type"), Some(MANUAL_ENTRY));
        assert_eq!(detection.metadata_str("location"), Some("Gate 3"));
    }
}
