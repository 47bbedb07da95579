use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wall_types::events::WallEvent;

use crate::bus::EventBus;
use crate::error::FeedError;
use crate::source::FeedSource;

pub const COUNT_POLL_INTERVAL: Duration = Duration::from_secs(15);
pub const COUNT_UP_STEPS: u64 = 30;
pub const COUNT_UP_DURATION: Duration = Duration::from_millis(1500);

pub const COUNT_ERROR: &str = "Failed to load count";

/// Total submissions plus the number currently on screen, which climbs
/// towards the total in fixed steps.
#[derive(Debug, Clone)]
pub struct SubmissionCounter {
    count: Option<u64>,
    displayed: u64,
    increment: u64,
    loading: bool,
    error: Option<String>,
    applied_seq: u64,
}

impl SubmissionCounter {
    pub fn new() -> Self {
        Self {
            count: None,
            displayed: 0,
            increment: 0,
            loading: true,
            error: None,
            applied_seq: 0,
        }
    }

    /// Last count the server reported, if any.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_counting(&self) -> bool {
        self.count.is_some_and(|c| self.displayed < c)
    }

    pub fn step_interval() -> Duration {
        COUNT_UP_DURATION / COUNT_UP_STEPS as u32
    }

    /// Apply the result of fetch number `seq`. Older results than one
    /// already applied are ignored. A failure keeps the last good count.
    pub fn apply(&mut self, seq: u64, result: Result<u64, FeedError>) {
        if seq <= self.applied_seq {
            return;
        }
        self.applied_seq = seq;
        self.loading = false;

        match result {
            Ok(count) => {
                self.error = None;
                self.count = Some(count);
                self.increment = count.div_ceil(COUNT_UP_STEPS).max(1);
                if count < self.displayed {
                    self.displayed = count;
                }
            }
            Err(e) => {
                warn!("Error fetching submission count: {}", e);
                self.error = Some(COUNT_ERROR.into());
            }
        }
    }

    /// One count-up step. Returns true while more steps remain.
    pub fn step(&mut self) -> bool {
        let Some(count) = self.count else { return false };
        self.displayed = (self.displayed + self.increment).min(count);
        self.displayed < count
    }

    /// What the counter line should say.
    pub fn label(&self) -> String {
        if self.loading {
            "...".into()
        } else {
            self.displayed.to_string()
        }
    }
}

impl Default for SubmissionCounter {
    fn default() -> Self {
        Self::new()
    }
}

pub trait CounterView: Send + 'static {
    fn render(&mut self, counter: &SubmissionCounter);
}

/// Polls the count and animates the displayed number.
pub struct CounterController<S, V> {
    source: Arc<S>,
    counter: SubmissionCounter,
    view: V,
    bus: EventBus,
    poll_interval: Duration,
    next_seq: u64,
}

impl<S: FeedSource, V: CounterView> CounterController<S, V> {
    pub fn new(source: Arc<S>, view: V, bus: EventBus) -> Self {
        Self {
            source,
            counter: SubmissionCounter::new(),
            view,
            bus,
            poll_interval: COUNT_POLL_INTERVAL,
            next_seq: 0,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> (SubmissionCounter, V) {
        let (results_tx, mut results_rx) = mpsc::channel::<(u64, Result<u64, FeedError>)>(8);
        let mut events = self.bus.subscribe();

        // First tick fires immediately and doubles as the initial fetch.
        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut steps = tokio::time::interval(SubmissionCounter::step_interval());

        self.view.render(&self.counter);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = poll.tick() => self.spawn_fetch(&results_tx),
                result = events.recv() => match result {
                    Ok(WallEvent::SubmissionCountUpdated) => self.spawn_fetch(&results_tx),
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => self.spawn_fetch(&results_tx),
                    Err(RecvError::Closed) => break,
                },
                Some((seq, result)) = results_rx.recv() => {
                    let was_counting = self.counter.is_counting();
                    self.counter.apply(seq, result);
                    if !was_counting && self.counter.is_counting() {
                        steps.reset();
                    }
                    self.view.render(&self.counter);
                }
                _ = steps.tick(), if self.counter.is_counting() => {
                    self.counter.step();
                    self.view.render(&self.counter);
                }
            }
        }

        debug!("Counter stopped");
        (self.counter, self.view)
    }

    fn spawn_fetch(&mut self, results: &mpsc::Sender<(u64, Result<u64, FeedError>)>) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let source = self.source.clone();
        let results = results.clone();

        tokio::spawn(async move {
            let result = source.fetch_count().await;
            let _ = results.send((seq, result)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use wall_types::Submission;
    use wall_types::api::CreateSubmissionRequest;

    use super::*;

    #[test]
    fn test_counts_up_in_thirty_steps() {
        let mut counter = SubmissionCounter::new();
        assert_eq!(counter.label(), "...");

        counter.apply(1, Ok(300));
        assert_eq!(counter.displayed(), 0);
        let mut steps = 0;
        while counter.step() {
            steps += 1;
        }
        assert_eq!(steps + 1, 30);
        assert_eq!(counter.displayed(), 300);
        assert_eq!(counter.label(), "300");
        assert_eq!(SubmissionCounter::step_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_small_count_steps_by_one() {
        let mut counter = SubmissionCounter::new();
        counter.apply(1, Ok(7));
        let mut steps = 1;
        while counter.step() {
            steps += 1;
        }
        assert_eq!(steps, 7);
        assert_eq!(counter.displayed(), 7);
    }

    #[test]
    fn test_error_keeps_last_good_value() {
        let mut counter = SubmissionCounter::new();
        counter.apply(1, Ok(12));
        while counter.step() {}

        counter.apply(2, Err(FeedError::Status(500)));
        assert_eq!(counter.error(), Some(COUNT_ERROR));
        assert_eq!(counter.count(), Some(12));
        assert_eq!(counter.displayed(), 12);

        counter.apply(3, Ok(13));
        assert_eq!(counter.error(), None);
    }

    #[test]
    fn test_older_result_is_ignored() {
        let mut counter = SubmissionCounter::new();
        counter.apply(2, Ok(20));
        counter.apply(1, Ok(10));
        assert_eq!(counter.count(), Some(20));
    }

    #[test]
    fn test_drop_snaps_down() {
        let mut counter = SubmissionCounter::new();
        counter.apply(1, Ok(40));
        while counter.step() {}
        counter.apply(2, Ok(0));
        assert_eq!(counter.displayed(), 0);
        assert!(!counter.is_counting());
    }

    #[derive(Default)]
    struct CountingSource {
        count: AtomicU64,
        fetches: AtomicUsize,
    }

    impl FeedSource for CountingSource {
        async fn fetch_recent(&self) -> Result<Vec<Submission>, FeedError> {
            Ok(Vec::new())
        }

        async fn fetch_count(&self) -> Result<u64, FeedError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.count.load(Ordering::SeqCst))
        }

        async fn submit(&self, _req: CreateSubmissionRequest) -> Result<Submission, FeedError> {
            Err(FeedError::Status(500))
        }
    }

    #[derive(Clone, Default)]
    struct Labels(Arc<Mutex<Vec<String>>>);

    impl CounterView for Labels {
        fn render(&mut self, counter: &SubmissionCounter) {
            self.0.lock().unwrap().push(counter.label());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller_polls_and_listens() {
        let source = Arc::new(CountingSource::default());
        source.count.store(90, Ordering::SeqCst);
        let bus = EventBus::new();
        let labels = Labels::default();
        let shutdown = CancellationToken::new();

        let controller = CounterController::new(source.clone(), labels.clone(), bus.clone());
        let task = tokio::spawn(controller.run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(labels.0.lock().unwrap().last().unwrap(), "90");

        source.count.store(91, Ordering::SeqCst);
        bus.publish(WallEvent::SubmissionCountUpdated);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(labels.0.lock().unwrap().last().unwrap(), "91");

        tokio::time::sleep(Duration::from_secs(12)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        let (counter, _) = task.await.unwrap();
        assert_eq!(counter.count(), Some(91));

        let labels = labels.0.lock().unwrap();
        assert_eq!(labels[0], "...");
        assert!(labels.iter().any(|l| l == "3"));
    }
}
