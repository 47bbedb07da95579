use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use wall_db::models::SubmissionRow;
use wall_types::Submission;
use wall_types::api::{CreateSubmissionRequest, CreateSubmissionResponse, RECENT_LIMIT};

use crate::blocklist::Blocklist;
use crate::error::ApiError;
use crate::state::AppState;

/// A submission that passed validation and the blocklist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub name: Option<String>,
    pub message: String,
    pub wallet: Option<String>,
}

/// Trim and check an incoming request. The message check runs first.
pub fn validate(req: CreateSubmissionRequest, blocklist: &Blocklist) -> Result<NewSubmission, ApiError> {
    let message = req
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or(ApiError::Validation("Message is required"))?
        .to_string();

    let name = trimmed_or_none(req.name);
    let wallet = trimmed_or_none(req.wallet);

    if blocklist.is_blocked(name.as_deref(), wallet.as_deref()) {
        return Err(ApiError::Blocked);
    }

    Ok(NewSubmission {
        name,
        message,
        wallet,
    })
}

fn trimmed_or_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn create_submission(
    State(state): State<AppState>,
    payload: Result<Json<CreateSubmissionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!("Rejected submission body: {}", e);
        ApiError::BadRequest("Invalid request body".into())
    })?;

    let new = match validate(req, &state.blocklist) {
        Ok(new) => new,
        Err(ApiError::Blocked) => {
            info!("Blocked submission rejected");
            return Err(ApiError::Blocked);
        }
        Err(e) => return Err(e),
    };

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let id = Uuid::new_v4();
    let row = tokio::task::spawn_blocking(move || {
        db.db.insert_submission(
            &id.to_string(),
            new.name.as_deref(),
            &new.message,
            new.wallet.as_deref(),
        )
    })
    .await
    .map_err(|e| ApiError::storage("Failed to create submission", e))?
    .map_err(|e| ApiError::storage("Failed to create submission", e))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSubmissionResponse {
            submission: row_to_submission(row),
            success: true,
        }),
    ))
}

/// Always the latest `RECENT_LIMIT` rows; the query string is ignored.
pub async fn list_submissions(State(state): State<AppState>) -> Result<Json<Vec<Submission>>, ApiError> {
    let db = state.clone();

    let rows = tokio::task::spawn_blocking(move || db.db.recent_submissions(RECENT_LIMIT))
        .await
        .map_err(|e| ApiError::storage("Failed to fetch messages", e))?
        .map_err(|e| ApiError::storage("Failed to fetch messages", e))?;

    Ok(Json(rows.into_iter().map(row_to_submission).collect()))
}

pub(crate) fn row_to_submission(row: SubmissionRow) -> Submission {
    Submission {
        id: parse_id(&row.id),
        created_at: parse_timestamp(&row.created_at, &row.id),
        name: row.name,
        message: row.message,
        wallet: row.wallet,
    }
}

pub(crate) fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt submission id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_timestamp(raw: &str, id: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows imported from older stores use "YYYY-MM-DD HH:MM:SS" without timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on row '{}': {}", raw, id, e);
            DateTime::default()
        })
}
