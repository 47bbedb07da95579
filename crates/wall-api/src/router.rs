use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;
use crate::{count, embed, legacy, submissions};

/// All wall routes. Cross-cutting layers (CORS, tracing) are added by the binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/submissions",
            get(submissions::list_submissions).post(submissions::create_submission),
        )
        .route("/submission-count", get(count::get_submission_count))
        // Paths used by earlier versions of the page
        .route(
            "/messages",
            get(submissions::list_submissions).post(legacy::create_legacy_message),
        )
        .route("/messages/submit", post(submissions::create_submission))
        .route("/embed/messages.js", get(embed::embed_script))
        .route("/embed/messages", get(embed::embed_page))
        .with_state(state)
}
