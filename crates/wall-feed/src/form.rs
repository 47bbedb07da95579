use rand::Rng;
use tracing::{info, warn};

use wall_types::Submission;
use wall_types::api::CreateSubmissionRequest;
use wall_types::events::WallEvent;

use crate::bus::EventBus;
use crate::error::FeedError;
use crate::source::FeedSource;

/// Shown after a successful post; one is picked at random.
pub const CONFIRMATIONS: &[&str] = &[
    "Etched.",
    "We heard you.",
    "It stays.",
    "One more voice in the dark.",
    "Buried in the wall.",
    "Your signal broke through.",
    "Marked.",
    "It's written.",
    "Whispered to the void.",
    "Echoes remain.",
    "Imprinted.",
    "Received.",
    "Absorbed.",
    "Recorded in the shadows.",
    "Witnessed.",
];

#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub name: String,
    pub message: String,
    pub wallet: String,
    submitting: bool,
    error: Option<String>,
    confirmation: Option<&'static str>,
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn confirmation(&self) -> Option<&'static str> {
        self.confirmation
    }

    pub fn dismiss_confirmation(&mut self) {
        self.confirmation = None;
    }

    fn request(&self) -> CreateSubmissionRequest {
        CreateSubmissionRequest {
            name: non_blank(&self.name),
            message: Some(self.message.trim().to_string()),
            wallet: non_blank(&self.wallet),
        }
    }

    /// Post the form. Blank messages never leave the client. On success the
    /// fields are cleared and the feed and counter are told to refresh; on
    /// failure everything typed is kept.
    pub async fn submit<S: FeedSource>(&mut self, source: &S, bus: &EventBus) -> Result<Submission, FeedError> {
        if self.message.trim().is_empty() {
            let err = FeedError::Validation("Message is required".into());
            self.error = Some(err.user_message());
            return Err(err);
        }

        self.submitting = true;
        self.error = None;
        self.confirmation = None;
        let result = source.submit(self.request()).await;
        self.submitting = false;

        match result {
            Ok(submission) => {
                info!("Submitted {}", submission.id);
                self.name.clear();
                self.message.clear();
                self.wallet.clear();
                self.confirmation = Some(pick_confirmation());
                bus.publish(WallEvent::MessageUpdated);
                bus.publish(WallEvent::SubmissionCountUpdated);
                Ok(submission)
            }
            Err(e) => {
                warn!("Error submitting message: {}", e);
                self.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn pick_confirmation() -> &'static str {
    CONFIRMATIONS[rand::rng().random_range(0..CONFIRMATIONS.len())]
}
