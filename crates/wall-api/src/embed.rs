use axum::{
    extract::Query,
    http::header,
    response::{Html, IntoResponse},
};

use wall_types::api::EmbedQuery;

/// Poll interval used by the embedded feed when none (or garbage) is given.
pub const DEFAULT_EMBED_INTERVAL_MS: i64 = 5000;

const EMBED_SCRIPT: &str = include_str!("../assets/embed.js");
const FEED_PAGE: &str = include_str!("../assets/feed.html");

/// `GET /embed/messages.js` — injects an iframe pointing at the feed-only page.
pub async fn embed_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript; charset=utf-8"),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        EMBED_SCRIPT,
    )
}

/// `GET /embed/messages?interval=N` — the feed alone, for the iframe.
pub async fn embed_page(Query(query): Query<EmbedQuery>) -> Html<String> {
    let interval = parse_interval(query.interval.as_deref());
    Html(FEED_PAGE.replace("__POLL_INTERVAL__", &interval.to_string()))
}

/// Parse the `interval` query parameter. Non-positive values disable polling.
pub fn parse_interval(raw: Option<&str>) -> i64 {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v as i64)
        .unwrap_or(DEFAULT_EMBED_INTERVAL_MS)
}
