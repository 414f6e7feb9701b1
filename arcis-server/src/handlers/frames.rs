//! Frame handlers
//!
//! Serve stored detection frames as a data-URL (JSON) or as `image/jpeg`.

use axum::{
    extract::{State, Path},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use arcis_core::frame::JPEG_MIME;

use crate::{AppState, AppResult, AppError};
use crate::models::{no_frame_data, Detection, RenderedFrame, StoredFrame};
use crate::middleware::auth::{require_clearance, Clearance, UserContext};

/// Real frames never change once stored
const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Placeholders may be replaced by a backfill
const PLACEHOLDER_CACHE: &str = "public, max-age=300";

pub const PLACEHOLDER_HEADER: &str = "x-placeholder";

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub detection_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_url: Option<String>,
    pub placeholder: bool,
    pub frame_metadata: Option<Value>,
}

async fn load_frame(state: &AppState, id: i64) -> AppResult<(RenderedFrame, Option<Value>)> {
    let row = Detection::frame(&state.pool, id)
        .await?
        .ok_or_else(AppError::detection_not_found)?;

    let frame_metadata = row.frame_metadata.clone();
    let stored = StoredFrame::from_row(row).ok_or_else(no_frame_data)?;

    Ok((stored.render(), frame_metadata))
}

/// Frame as a JPEG data-URL
pub async fn get_frame(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Json<FrameResponse>> {
    require_clearance(&user, Clearance::Viewer)?;
    let (rendered, frame_metadata) = load_frame(&state, id).await?;

    let response = match rendered {
        RenderedFrame::Image(frame) => FrameResponse {
            detection_id: id,
            frame_data: Some(frame.to_data_url()),
            frame_url: None,
            placeholder: frame.is_placeholder(),
            frame_metadata,
        },
        RenderedFrame::External(url) => FrameResponse {
            detection_id: id,
            frame_data: None,
            frame_url: Some(url),
            placeholder: false,
            frame_metadata,
        },
    };

    Ok(Json(response))
}

/// Frame as binary `image/jpeg`
pub async fn get_jpeg(
    State(state): State<AppState>,
    user: UserContext,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    require_clearance(&user, Clearance::Viewer)?;
    let (rendered, _) = load_frame(&state, id).await?;

    let frame = match rendered {
        RenderedFrame::Image(frame) => frame,
        RenderedFrame::External(url) => return Ok(Redirect::temporary(&url).into_response()),
    };

    if frame.is_placeholder() {
        return Ok((
            [
                (header::CONTENT_TYPE, JPEG_MIME),
                (header::CACHE_CONTROL, PLACEHOLDER_CACHE),
                (header::HeaderName::from_static(PLACEHOLDER_HEADER), "true"),
            ],
            frame.into_bytes(),
        )
            .into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, JPEG_MIME),
            (header::CACHE_CONTROL, IMMUTABLE_CACHE),
            (header::HeaderName::from_static("cross-origin-resource-policy"), "cross-origin"),
        ],
        frame.into_bytes(),
    )
        .into_response())
}
