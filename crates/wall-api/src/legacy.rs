use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use wall_types::api::{CreateLegacyMessageRequest, CreateLegacyMessageResponse};
use wall_types::models::LegacyMessage;

use crate::error::ApiError;
use crate::state::AppState;
use crate::submissions::{parse_id, parse_timestamp};

/// `POST /messages` — the text-only endpoint older clients still call.
/// Rows land in the legacy table: they count, but are not listed.
pub async fn create_legacy_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateLegacyMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|_| ApiError::BadRequest("Invalid request body".into()))?;

    let text = req
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Validation("Message text is required"))?
        .to_string();

    let db = state.clone();
    let id = Uuid::new_v4().to_string();
    let row = tokio::task::spawn_blocking(move || db.db.insert_legacy_message(&id, &text))
        .await
        .map_err(|e| ApiError::storage("Failed to create message", e))?
        .map_err(|e| ApiError::storage("Failed to create message", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateLegacyMessageResponse {
            message: LegacyMessage {
                id: parse_id(&row.id),
                created_at: parse_timestamp(&row.created_at, &row.id),
                text: row.text,
            },
            success: true,
        }),
    ))
}
