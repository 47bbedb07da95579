use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when a submission carries no name.
pub const ANONYMOUS: &str = "Anonymous";

/// A message posted to the wall. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub name: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// The name to render. Null names are only substituted here, never in storage.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANONYMOUS)
    }
}

/// A row of the pre-submissions `messages` table: text only, no name or wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMessage {
    pub id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
