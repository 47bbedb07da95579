use std::future::Future;

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use wall_types::Submission;
use wall_types::api::{CountResponse, CreateSubmissionRequest, CreateSubmissionResponse, ErrorResponse};

use crate::error::FeedError;

/// Where the client reads the wall from and posts to it.
pub trait FeedSource: Send + Sync + 'static {
    /// Most recent submissions, newest first.
    fn fetch_recent(&self) -> impl Future<Output = Result<Vec<Submission>, FeedError>> + Send;

    fn fetch_count(&self) -> impl Future<Output = Result<u64, FeedError>> + Send;

    fn submit(&self, req: CreateSubmissionRequest) -> impl Future<Output = Result<Submission, FeedError>> + Send;
}

/// [`FeedSource`] over the wall's HTTP API.
#[derive(Clone)]
pub struct HttpFeedSource {
    client: Client,
    base_url: String,
}

impl HttpFeedSource {
    /// No request timeout: a hung fetch leaves the feed as it was, and the
    /// next poll's result replaces it.
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Non-2xx into an error. A 400 carries the server's `error` text.
async fn check(resp: Response) -> Result<Response, FeedError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::BAD_REQUEST {
        if let Ok(body) = resp.json::<ErrorResponse>().await {
            return Err(FeedError::Rejected(body.error));
        }
    }
    Err(FeedError::Status(status.as_u16()))
}

impl FeedSource for HttpFeedSource {
    async fn fetch_recent(&self) -> Result<Vec<Submission>, FeedError> {
        let resp = self.client.get(self.url("/submissions")).send().await?;
        let rows: Vec<Submission> = check(resp).await?.json().await?;
        debug!("Fetched {} submissions", rows.len());
        Ok(rows)
    }

    async fn fetch_count(&self) -> Result<u64, FeedError> {
        let resp = self.client.get(self.url("/submission-count")).send().await?;
        let body: CountResponse = check(resp).await?.json().await?;
        Ok(body.count)
    }

    async fn submit(&self, req: CreateSubmissionRequest) -> Result<Submission, FeedError> {
        let resp = self.client.post(self.url("/submissions")).json(&req).send().await?;
        let body: CreateSubmissionResponse = check(resp).await?.json().await?;
        Ok(body.submission)
    }
}
