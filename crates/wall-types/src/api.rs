use serde::{Deserialize, Serialize};

use crate::models::{LegacyMessage, Submission};

/// Hard cap on rows returned by the recent-submissions listing.
pub const RECENT_LIMIT: u32 = 50;

// -- Submissions --

/// Body of `POST /submissions`.
///
/// Every field is optional at the wire level so that a missing or blank
/// `message` surfaces as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubmissionRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub wallet: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSubmissionResponse {
    pub submission: Submission,
    pub success: bool,
}

// -- Count --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountErrorResponse {
    pub error: String,
    pub count: u64,
}

// -- Legacy messages --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLegacyMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLegacyMessageResponse {
    pub message: LegacyMessage,
    pub success: bool,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// -- Embed --

#[derive(Debug, Default, Deserialize)]
pub struct EmbedQuery {
    pub interval: Option<String>,
}
