//! Alert model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use arcis_core::threat::AlertPlan;

use super::page;

pub const MANUAL_ALERT_TYPE: &str = "manual_weapon_alert";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Alert {
    pub id: i64,
    pub detection_id: Option<i64>,
    pub alert_type: String,
    pub category: String,
    pub severity: i16,
    pub title: Option<String>,
    pub description: Option<String>,
    pub action_required: Option<String>,
    pub metadata: Value,
    pub is_acknowledged: bool,
    pub acknowledged_by: Option<Uuid>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAlertRequest {
    pub detection_id: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub alert_type: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub severity: i16,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1))]
    pub description: String,
    pub weapon_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AcknowledgeRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct AlertFilter {
    pub acknowledged: Option<bool>,
    pub min_severity: Option<i16>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Alert {
    /// Insert the automatic alert for a freshly persisted detection
    pub async fn create_for_detection(
        conn: &mut PgConnection,
        detection_id: i64,
        plan: &AlertPlan,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (detection_id, alert_type, category, severity, action_required)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#
        )
        .bind(detection_id)
        .bind(plan.alert_type)
        .bind(plan.category)
        .bind(i16::from(plan.severity.value()))
        .bind(&plan.action_required)
        .fetch_one(conn)
        .await
    }

    pub async fn create_manual(
        pool: &PgPool,
        data: &CreateAlertRequest,
        weapon_type: &str,
        created_by: Uuid,
    ) -> Result<Self, sqlx::Error> {
        let metadata = json!({
            "created_by": created_by,
            "weapon_type": weapon_type,
            "manual_alert": true,
        });

        sqlx::query_as::<_, Alert>(
            r#"
            INSERT INTO alerts (detection_id, alert_type, severity, title, description, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#
        )
        .bind(data.detection_id)
        .bind(data.alert_type.as_deref().unwrap_or(MANUAL_ALERT_TYPE))
        .bind(data.severity)
        .bind(&data.title)
        .bind(&data.description)
        .bind(&metadata)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Alert>("SELECT * FROM alerts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, filter: &AlertFilter) -> Result<Vec<Self>, sqlx::Error> {
        let (limit, offset) = page(filter.limit, filter.offset);

        sqlx::query_as::<_, Alert>(
            r#"
            SELECT * FROM alerts
            WHERE ($1::bool IS NULL OR is_acknowledged = $1)
              AND ($2::smallint IS NULL OR severity >= $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        )
        .bind(filter.acknowledged)
        .bind(filter.min_severity)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// Mark acknowledged. Repeat calls keep the first acknowledger and time;
    /// notes, when given, replace earlier notes.
    pub async fn acknowledge(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Alert>(
            r#"
            UPDATE alerts
            SET is_acknowledged = true,
                acknowledged_by = COALESCE(acknowledged_by, $2),
                acknowledged_at = COALESCE(acknowledged_at, NOW()),
                notes = COALESCE($3, notes)
            WHERE id = $1
            RETURNING *
            "#
        )
        .bind(id)
        .bind(user_id)
        .bind(notes)
        .fetch_optional(pool)
        .await
    }

    /// Unacknowledged alerts per severity
    pub async fn count_unacknowledged_by_severity(pool: &PgPool) -> Result<Vec<(i16, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (i16, i64)>(
            r#"
            SELECT severity, COUNT(*) FROM alerts
            WHERE NOT is_acknowledged
            GROUP BY severity
            "#
        )
        .fetch_all(pool)
        .await
    }
}
