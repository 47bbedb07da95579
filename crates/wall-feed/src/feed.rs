//! Feed snapshot state and novelty detection.
//!
//! Each row moves `unseen → pending animation → animated`. A row is novel
//! when its id is in neither the previous snapshot nor the Animated-Set;
//! it leaves the pending state once every field that animates has finished,
//! or when the next snapshot arrives first. Rows from the previous snapshot
//! always render in full.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};
use uuid::Uuid;

use wall_types::Submission;

use crate::animated::{AnimatedSet, AnimationKey, Field};
use crate::error::FeedError;
use crate::storage::{SharedStorage, USER_SUBMITTED_KEY};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Longer messages are shown whole; only their name line types out.
pub const MAX_ANIMATED_MESSAGE_CHARS: usize = 100;

pub const FEED_ERROR: &str = "Failed to load messages. Please try again later.";

/// What the first snapshot of a session does with rows never animated before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirstLoad {
    /// Apply the usual rule: anything not yet in the Animated-Set types out.
    #[default]
    AnimateUnseen,
    /// Show the first snapshot as-is; only later arrivals animate.
    Settle,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// `None` disables polling; the feed then only refreshes on events.
    pub poll_interval: Option<Duration>,
    pub first_load: FirstLoad,
    pub max_animated_message_chars: usize,
}

impl FeedConfig {
    /// Interval in milliseconds as it arrives from a query string or env var.
    pub fn with_poll_interval_ms(mut self, ms: i64) -> Self {
        self.poll_interval = u64::try_from(ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);
        self
    }

    pub fn with_first_load(mut self, first_load: FirstLoad) -> Self {
        self.first_load = first_load;
        self
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            first_load: FirstLoad::default(),
            max_animated_message_chars: MAX_ANIMATED_MESSAGE_CHARS,
        }
    }
}

/// Why a fetch was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOrigin {
    Initial,
    Poll,
    /// This client just submitted.
    MessageUpdated,
}

/// Handed out when a fetch starts and passed back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub origin: FetchOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The snapshot replaced the feed. `novel` lists rows marked new by it;
    /// `settled` lists rows whose unfinished reveal it cut short.
    Applied { novel: Vec<Uuid>, settled: Vec<Uuid> },
    /// The fetch failed; rows are kept and the error is set.
    Failed,
    /// A newer fetch was already applied; this result was dropped.
    Stale,
}

#[derive(Debug, Clone)]
pub struct FeedRow {
    pub submission: Submission,
    pub is_new: bool,
    pending: Vec<Field>,
}

impl FeedRow {
    /// Whether `field` of this row should currently render through a reveal.
    pub fn animates(&self, field: Field) -> bool {
        self.is_new && self.pending.contains(&field)
    }

    pub fn pending_fields(&self) -> &[Field] {
        &self.pending
    }

    pub fn id(&self) -> Uuid {
        self.submission.id
    }
}

pub struct FeedState {
    config: FeedConfig,
    rows: Vec<FeedRow>,
    animated: AnimatedSet,
    session: SharedStorage,
    next_seq: u64,
    applied_seq: u64,
    applied_any: bool,
    loading: bool,
    error: Option<String>,
    has_new_messages: bool,
}

impl FeedState {
    pub fn new(config: FeedConfig, animated: AnimatedSet, session: SharedStorage) -> Self {
        Self {
            config,
            rows: Vec::new(),
            animated,
            session,
            next_seq: 0,
            applied_seq: 0,
            applied_any: false,
            loading: false,
            error: None,
            has_new_messages: false,
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Rows in the order the server returned them.
    pub fn rows(&self) -> &[FeedRow] {
        &self.rows
    }

    pub fn row(&self, id: &Uuid) -> Option<&FeedRow> {
        self.rows.iter().find(|r| r.id() == *id)
    }

    pub fn animated(&self) -> &AnimatedSet {
        &self.animated
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// New rows arrived that were not caused by this client's own submission.
    pub fn has_new_messages(&self) -> bool {
        self.has_new_messages
    }

    /// Start a fetch. A fetch caused by our own submission raises the
    /// session flag that the next applied snapshot consumes.
    pub fn begin_fetch(&mut self, origin: FetchOrigin) -> FetchTicket {
        self.next_seq += 1;
        self.loading = true;

        if origin == FetchOrigin::MessageUpdated {
            if let Err(e) = self.session.set(USER_SUBMITTED_KEY, "true") {
                warn!("Error setting user-submitted flag: {}", e);
            }
        }

        FetchTicket {
            seq: self.next_seq,
            origin,
        }
    }

    /// Apply a finished fetch. Only results newer than the last applied one
    /// are used, so overlapping fetches resolve to the latest.
    pub fn apply(&mut self, ticket: FetchTicket, result: Result<Vec<Submission>, FeedError>) -> ApplyOutcome {
        if ticket.seq <= self.applied_seq {
            debug!("Dropping stale feed result #{} (applied #{})", ticket.seq, self.applied_seq);
            return ApplyOutcome::Stale;
        }
        self.applied_seq = ticket.seq;
        if ticket.seq == self.next_seq {
            self.loading = false;
        }

        let submissions = match result {
            Ok(submissions) => submissions,
            Err(e) => {
                warn!("Error fetching submissions: {}", e);
                self.error = Some(FEED_ERROR.into());
                return ApplyOutcome::Failed;
            }
        };

        let settle = !self.applied_any && self.config.first_load == FirstLoad::Settle;
        let mut previous: HashMap<Uuid, FeedRow> = self.rows.drain(..).map(|r| (r.id(), r)).collect();
        let mut novel = Vec::new();
        let mut settled = Vec::new();

        let rows = submissions
            .into_iter()
            .map(|submission| {
                let id = submission.id;
                if let Some(prev) = previous.remove(&id) {
                    if prev.is_new {
                        settled.push(id);
                    }
                    return FeedRow {
                        submission,
                        is_new: false,
                        pending: Vec::new(),
                    };
                }

                let is_new = !settle && !self.animated.contains(&id);
                let pending = if is_new {
                    novel.push(id);
                    self.fields_to_animate(&submission)
                } else {
                    Vec::new()
                };
                FeedRow {
                    submission,
                    is_new,
                    pending,
                }
            })
            .collect();
        self.rows = rows;
        for id in &settled {
            self.animated.insert(*id);
        }

        let user_submitted = self.take_user_submitted();
        self.has_new_messages = !novel.is_empty() && !user_submitted;
        self.error = None;
        self.applied_any = true;

        ApplyOutcome::Applied { novel, settled }
    }

    /// A field's reveal finished. When it was the row's last one, the row is
    /// recorded in the Animated-Set and stops being new. Returns true then.
    pub fn complete_field(&mut self, key: AnimationKey) -> bool {
        let Some(row) = self.rows.iter_mut().find(|r| r.submission.id == key.id) else {
            // Scrolled out of the snapshot mid-reveal; still counts as shown.
            self.animated.insert(key.id);
            return true;
        };

        row.pending.retain(|f| *f != key.field);
        if row.is_new && row.pending.is_empty() {
            row.is_new = false;
            self.animated.insert(key.id);
            return true;
        }
        false
    }

    fn fields_to_animate(&self, submission: &Submission) -> Vec<Field> {
        let mut fields = vec![Field::Name];
        if submission.message.chars().count() <= self.config.max_animated_message_chars {
            fields.push(Field::Message);
        }
        fields
    }

    fn take_user_submitted(&self) -> bool {
        match self.session.get(USER_SUBMITTED_KEY) {
            Ok(Some(flag)) => {
                if let Err(e) = self.session.remove(USER_SUBMITTED_KEY) {
                    warn!("Error clearing user-submitted flag: {}", e);
                }
                flag == "true"
            }
            Ok(None) => false,
            Err(e) => {
                warn!("Error reading user-submitted flag: {}", e);
                false
            }
        }
    }

    /// Ids currently in the snapshot, for callers that diff on their own.
    pub fn ids(&self) -> HashSet<Uuid> {
        self.rows.iter().map(FeedRow::id).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, TimeZone, Utc};

    use super::*;
    use crate::storage::{MemoryStorage, Storage};

    fn submission(n: u32, message: &str) -> Submission {
        Submission {
            id: Uuid::from_u128(n as u128),
            name: None,
            message: message.into(),
            wallet: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + ChronoDuration::seconds(n as i64),
        }
    }

    /// Newest first, as the server sends them.
    fn snapshot(ns: &[u32]) -> Vec<Submission> {
        let mut ns = ns.to_vec();
        ns.sort_unstable_by(|a, b| b.cmp(a));
        ns.into_iter().map(|n| submission(n, &format!("m{}", n))).collect()
    }

    struct Harness {
        local: SharedStorage,
        session: SharedStorage,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                local: Arc::new(MemoryStorage::new()),
                session: Arc::new(MemoryStorage::new()),
            }
        }

        fn state(&self, config: FeedConfig) -> FeedState {
            FeedState::new(config, AnimatedSet::load(self.local.clone()), self.session.clone())
        }
    }

    fn fetch(state: &mut FeedState, origin: FetchOrigin, rows: Vec<Submission>) -> ApplyOutcome {
        let ticket = state.begin_fetch(origin);
        state.apply(ticket, Ok(rows))
    }

    fn finish_row(state: &mut FeedState, id: Uuid) {
        let fields = state.row(&id).unwrap().pending_fields().to_vec();
        for field in fields {
            state.complete_field(AnimationKey { id, field });
        }
    }

    fn novel(outcome: ApplyOutcome) -> Vec<Uuid> {
        match outcome {
            ApplyOutcome::Applied { novel, .. } => novel,
            other => panic!("expected Applied, got {:?}", other),
        }
    }

    #[test]
    fn test_fresh_client_animates_unseen_rows() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());

        let marked = novel(fetch(&mut state, FetchOrigin::Initial, snapshot(&[1, 2, 3])));
        assert_eq!(marked.len(), 3);
        assert!(state.rows().iter().all(|r| r.is_new));
        assert!(state.has_new_messages());
    }

    #[test]
    fn test_settle_marks_nothing_on_first_load() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default().with_first_load(FirstLoad::Settle));

        assert!(novel(fetch(&mut state, FetchOrigin::Initial, snapshot(&[1, 2]))).is_empty());
        assert!(!state.has_new_messages());

        let marked = novel(fetch(&mut state, FetchOrigin::Poll, snapshot(&[1, 2, 3])));
        assert_eq!(marked, vec![Uuid::from_u128(3)]);
    }

    #[test]
    fn test_rows_keep_server_order() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        let rows = vec![submission(5, "a"), submission(9, "b"), submission(1, "c")];
        fetch(&mut state, FetchOrigin::Initial, rows);

        let order: Vec<u128> = state.rows().iter().map(|r| r.id().as_u128()).collect();
        assert_eq!(order, vec![5, 9, 1]);
    }

    #[test]
    fn test_row_is_never_novel_twice() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        let mut times_marked: HashMap<Uuid, usize> = HashMap::new();

        // Polls at t=0, 5, 10; new data only before t=5.
        for rows in [snapshot(&[1, 2]), snapshot(&[1, 2, 3]), snapshot(&[1, 2, 3])] {
            for id in novel(fetch(&mut state, FetchOrigin::Poll, rows)) {
                *times_marked.entry(id).or_default() += 1;
            }
        }

        assert!(times_marked.values().all(|n| *n == 1));
        assert_eq!(times_marked.len(), 3);
    }

    #[test]
    fn test_completion_survives_reload() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        fetch(&mut state, FetchOrigin::Initial, snapshot(&[7]));

        let id = Uuid::from_u128(7);
        assert!(!state.complete_field(AnimationKey::name(id)));
        assert!(state.row(&id).unwrap().is_new);
        assert!(state.complete_field(AnimationKey::message(id)));
        assert!(!state.row(&id).unwrap().is_new);
        assert!(state.animated().contains(&id));

        // Simulated page reload: new in-memory state over the same storage.
        let mut reloaded = h.state(FeedConfig::default());
        assert!(novel(fetch(&mut reloaded, FetchOrigin::Initial, snapshot(&[7]))).is_empty());
        assert!(!reloaded.row(&id).unwrap().animates(Field::Message));
    }

    #[test]
    fn test_next_snapshot_settles_unfinished_reveal() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        fetch(&mut state, FetchOrigin::Poll, snapshot(&[1]));
        let id = Uuid::from_u128(1);
        state.complete_field(AnimationKey::name(id));

        // Next poll arrives before the message finished typing.
        let outcome = fetch(&mut state, FetchOrigin::Poll, snapshot(&[1]));
        assert_eq!(
            outcome,
            ApplyOutcome::Applied {
                novel: Vec::new(),
                settled: vec![id],
            }
        );
        let row = state.row(&id).unwrap();
        assert!(!row.is_new);
        assert!(!row.animates(Field::Message));
        assert!(state.animated().contains(&id));

        // A late completion for the cut-short field changes nothing.
        assert!(!state.complete_field(AnimationKey::message(id)));

        // Settled rows stay settled after a reload.
        let mut reloaded = h.state(FeedConfig::default());
        assert!(novel(fetch(&mut reloaded, FetchOrigin::Initial, snapshot(&[1]))).is_empty());
    }

    #[test]
    fn test_own_submission_suppresses_notice_not_animation() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        fetch(&mut state, FetchOrigin::Initial, snapshot(&[1]));
        finish_row(&mut state, Uuid::from_u128(1));

        let marked = novel(fetch(&mut state, FetchOrigin::MessageUpdated, snapshot(&[1, 2])));
        assert_eq!(marked, vec![Uuid::from_u128(2)]);
        assert!(state.row(&Uuid::from_u128(2)).unwrap().animates(Field::Name));
        assert!(!state.has_new_messages());
        // Flag is consumed by that snapshot.
        assert_eq!(h.session.get(USER_SUBMITTED_KEY).unwrap(), None);

        fetch(&mut state, FetchOrigin::Poll, snapshot(&[1, 2, 3]));
        assert!(state.has_new_messages());
    }

    #[test]
    fn test_stale_results_are_dropped() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());

        let slow = state.begin_fetch(FetchOrigin::Poll);
        let fast = state.begin_fetch(FetchOrigin::Poll);
        assert!(state.is_loading());

        assert!(matches!(state.apply(fast, Ok(snapshot(&[1, 2]))), ApplyOutcome::Applied { .. }));
        assert!(!state.is_loading());
        assert_eq!(state.apply(slow, Ok(snapshot(&[1]))), ApplyOutcome::Stale);
        assert_eq!(state.rows().len(), 2);

        // A late failure for a superseded fetch is ignored as well.
        let older = state.begin_fetch(FetchOrigin::Poll);
        let newer = state.begin_fetch(FetchOrigin::Poll);
        state.apply(newer, Ok(snapshot(&[1, 2, 3])));
        assert_eq!(state.apply(older, Err(FeedError::Status(500))), ApplyOutcome::Stale);
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_error_keeps_rows_until_next_success() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        fetch(&mut state, FetchOrigin::Initial, snapshot(&[1, 2]));

        let ticket = state.begin_fetch(FetchOrigin::Poll);
        assert_eq!(state.apply(ticket, Err(FeedError::Status(503))), ApplyOutcome::Failed);
        assert_eq!(state.error(), Some(FEED_ERROR));
        assert_eq!(state.rows().len(), 2);

        fetch(&mut state, FetchOrigin::Poll, snapshot(&[1, 2]));
        assert_eq!(state.error(), None);
    }

    #[test]
    fn test_long_message_only_types_name() {
        let h = Harness::new();
        let mut state = h.state(FeedConfig::default());
        let long = "x".repeat(MAX_ANIMATED_MESSAGE_CHARS + 1);
        fetch(&mut state, FetchOrigin::Initial, vec![submission(1, &long)]);

        let id = Uuid::from_u128(1);
        let row = state.row(&id).unwrap();
        assert!(row.animates(Field::Name));
        assert!(!row.animates(Field::Message));
        assert!(state.complete_field(AnimationKey::name(id)));
    }

    #[test]
    fn test_poll_interval_from_ms() {
        assert_eq!(
            FeedConfig::default().with_poll_interval_ms(2500).poll_interval,
            Some(Duration::from_millis(2500))
        );
        assert_eq!(FeedConfig::default().with_poll_interval_ms(0).poll_interval, None);
        assert_eq!(FeedConfig::default().with_poll_interval_ms(-10).poll_interval, None);
    }
}
