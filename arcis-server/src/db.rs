//! Database module - PostgreSQL connection and schema bootstrap

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Apply the idempotent schema
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Simple protocol: several statements in one round trip
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Detections (device, batch and manual entries)
CREATE TABLE IF NOT EXISTS detections (
    id BIGSERIAL PRIMARY KEY,
    object_category VARCHAR(50) NOT NULL DEFAULT 'weapon',
    object_type VARCHAR(20) NOT NULL
        CHECK (object_type IN ('Knife', 'Pistol', 'weapon', 'rifle')),
    confidence DOUBLE PRECISION NOT NULL
        CHECK (confidence >= 0 AND confidence <= 1),
    threat_level SMALLINT NOT NULL
        CHECK (threat_level BETWEEN 0 AND 10),
    bounding_box JSONB,
    timestamp TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    system_metrics JSONB,
    frame_data TEXT,
    frame_jpeg BYTEA,
    frame_url TEXT,
    frame_metadata JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    CONSTRAINT detections_single_frame
        CHECK (num_nonnulls(frame_data, frame_jpeg, frame_url) <= 1)
);

-- Alerts (automatic for threat level >= 7, or raised manually)
CREATE TABLE IF NOT EXISTS alerts (
    id BIGSERIAL PRIMARY KEY,
    detection_id BIGINT REFERENCES detections(id) ON DELETE CASCADE,
    alert_type VARCHAR(50) NOT NULL,
    category VARCHAR(50) NOT NULL DEFAULT 'security',
    severity SMALLINT NOT NULL CHECK (severity BETWEEN 1 AND 5),
    title VARCHAR(255),
    description TEXT,
    action_required TEXT,
    metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
    is_acknowledged BOOLEAN NOT NULL DEFAULT false,
    acknowledged_by UUID,
    acknowledged_at TIMESTAMPTZ,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_detections_timestamp ON detections(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_detections_threat_level ON detections(threat_level);
CREATE INDEX IF NOT EXISTS idx_detections_object_type ON detections(object_type);
CREATE INDEX IF NOT EXISTS idx_detections_entry_type ON detections((metadata->>'entry_type'));
CREATE INDEX IF NOT EXISTS idx_alerts_detection ON alerts(detection_id);
CREATE INDEX IF NOT EXISTS idx_alerts_unacknowledged ON alerts(created_at DESC) WHERE NOT is_acknowledged;
"#;
