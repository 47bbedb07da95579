use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wall_types::Submission;
use wall_types::events::WallEvent;

use crate::animated::{AnimationKey, Field};
use crate::bus::EventBus;
use crate::error::FeedError;
use crate::feed::{ApplyOutcome, FeedState, FetchOrigin, FetchTicket};
use crate::source::FeedSource;
use crate::typing::{StartOutcome, Typewriter, TypingConfig};

/// Animation frame pace while any reveal is running.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Something that draws the feed.
pub trait FeedView: Send + 'static {
    fn render(&mut self, state: &FeedState, typewriter: &Typewriter);

    /// Current scroll position, in whatever unit the view scrolls by.
    fn scroll_offset(&self) -> usize;

    fn set_scroll_offset(&mut self, offset: usize);
}

type FetchResult = (FetchTicket, Result<Vec<Submission>, FeedError>);

/// Owns the feed state and drives it from timers, bus events and fetch results.
pub struct FeedController<S, V> {
    source: Arc<S>,
    state: FeedState,
    typewriter: Typewriter,
    view: V,
    bus: EventBus,
    last_frame: Option<Instant>,
}

impl<S: FeedSource, V: FeedView> FeedController<S, V> {
    pub fn new(source: Arc<S>, state: FeedState, typewriter: Typewriter, view: V, bus: EventBus) -> Self {
        Self {
            source,
            state,
            typewriter,
            view,
            bus,
            last_frame: None,
        }
    }

    /// Run until `shutdown` fires, then hand back the state and the view.
    ///
    /// Fetches still in flight at that point finish on their own; their
    /// results go nowhere.
    pub async fn run(mut self, shutdown: CancellationToken) -> (FeedState, V) {
        let (results_tx, mut results_rx) = mpsc::channel::<FetchResult>(16);
        let mut events = self.bus.subscribe();

        let mut poll = self.state.config().poll_interval.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        let mut frames = tokio::time::interval(FRAME_INTERVAL);
        frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Feed started (polling {})",
            match self.state.config().poll_interval {
                Some(p) => format!("every {} ms", p.as_millis()),
                None => "disabled".into(),
            }
        );

        self.render_in_place();
        self.spawn_fetch(FetchOrigin::Initial, &results_tx);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = next_tick(&mut poll) => {
                    self.spawn_fetch(FetchOrigin::Poll, &results_tx);
                }
                result = events.recv() => match result {
                    Ok(WallEvent::MessageUpdated) => {
                        self.spawn_fetch(FetchOrigin::MessageUpdated, &results_tx);
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        warn!("Feed lagged by {} events, refetching", n);
                        self.spawn_fetch(FetchOrigin::Poll, &results_tx);
                    }
                    Err(RecvError::Closed) => break,
                },
                Some((ticket, result)) = results_rx.recv() => {
                    self.on_result(ticket, result);
                }
                now = frames.tick(), if !self.typewriter.is_idle() => {
                    self.on_frame(now);
                }
            }
        }

        debug!("Feed stopped");
        (self.state, self.view)
    }

    fn spawn_fetch(&mut self, origin: FetchOrigin, results: &mpsc::Sender<FetchResult>) {
        let ticket = self.state.begin_fetch(origin);
        let source = self.source.clone();
        let results = results.clone();
        debug!("Fetch #{} ({:?})", ticket.seq, origin);

        tokio::spawn(async move {
            let result = source.fetch_recent().await;
            let _ = results.send((ticket, result)).await;
        });
    }

    fn on_result(&mut self, ticket: FetchTicket, result: Result<Vec<Submission>, FeedError>) {
        match self.state.apply(ticket, result) {
            ApplyOutcome::Stale => return,
            ApplyOutcome::Failed => {}
            ApplyOutcome::Applied { novel, settled } => {
                if !novel.is_empty() {
                    debug!("{} new rows", novel.len());
                }
                for id in settled {
                    self.typewriter.settle(id);
                }
                self.start_reveals(&novel);
            }
        }
        self.render_in_place();
    }

    /// Re-render without moving the reader's scroll position.
    fn render_in_place(&mut self) {
        let offset = self.view.scroll_offset();
        self.view.render(&self.state, &self.typewriter);
        self.view.set_scroll_offset(offset);
    }

    fn start_reveals(&mut self, ids: &[Uuid]) {
        if self.typewriter.is_idle() {
            self.last_frame = None;
        }

        for id in ids {
            let Some(row) = self.state.row(id) else { continue };
            let jobs: Vec<(AnimationKey, String, TypingConfig)> = row
                .pending_fields()
                .iter()
                .map(|field| match field {
                    Field::Name => (
                        AnimationKey::name(*id),
                        format!("{} →", row.submission.display_name()),
                        TypingConfig::name(),
                    ),
                    Field::Message => (
                        AnimationKey::message(*id),
                        row.submission.message.clone(),
                        TypingConfig::message(),
                    ),
                })
                .collect();

            for (key, text, config) in jobs {
                if self.typewriter.start(key, text, config) == StartOutcome::AlreadyPlayed {
                    self.state.complete_field(key);
                }
            }
        }
    }

    fn on_frame(&mut self, now: Instant) {
        let dt = match self.last_frame.replace(now) {
            Some(prev) => now.saturating_duration_since(prev),
            None => Duration::ZERO,
        };

        for key in self.typewriter.advance(dt) {
            self.state.complete_field(key);
        }
        self.render_in_place();
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
