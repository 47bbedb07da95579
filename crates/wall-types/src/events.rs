use serde::{Deserialize, Serialize};

/// Notifications passed between the form, the feed and the counter on a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WallEvent {
    /// This client just stored a submission; the feed should re-poll.
    MessageUpdated,

    /// The total count changed; the counter should re-fetch.
    SubmissionCountUpdated,
}
