//! One-shot character reveal.
//!
//! A [`TypingAnimation`] is a small time-driven state machine: callers feed
//! it elapsed time through [`TypingAnimation::advance`] and read back the
//! visible prefix. Nothing here owns a timer, which keeps the engine
//! deterministic under test.

use std::collections::HashMap;
use std::time::Duration;

use uuid::Uuid;

use crate::animated::{AnimationKey, AnimationLedger};

/// Cursor drawn after the revealed text while typing.
pub const CURSOR: char = '▌';

/// Pace of a reveal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypingConfig {
    /// Base delay between characters.
    pub char_interval: Duration,
    /// Wait before the first character appears.
    pub start_delay: Duration,
    /// Keep the cursor after finishing.
    pub show_cursor: bool,
}

impl TypingConfig {
    /// Pace used for the "name →" line.
    pub const fn name() -> Self {
        Self {
            char_interval: Duration::from_millis(20),
            start_delay: Duration::ZERO,
            show_cursor: true,
        }
    }

    /// Pace used for the message body.
    pub const fn message() -> Self {
        Self {
            char_interval: Duration::from_millis(25),
            start_delay: Duration::from_millis(300),
            show_cursor: true,
        }
    }

    /// Delay before `next` is revealed. Whitespace and punctuation come
    /// after half the base interval.
    pub fn delay_before(&self, next: Option<char>) -> Duration {
        match next {
            Some(c) if is_quick(c) => self.char_interval / 2,
            _ => self.char_interval,
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            char_interval: Duration::from_millis(30),
            start_delay: Duration::ZERO,
            show_cursor: true,
        }
    }
}

fn is_quick(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | ',' | '!' | '?' | ';' | ':')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Waiting out the start delay.
    Delay(Duration),
    /// Time left until the next step.
    Typing(Duration),
    Done,
}

type CompletionCallback = Box<dyn FnOnce(AnimationKey) + Send>;

pub struct TypingAnimation {
    key: AnimationKey,
    text: String,
    char_count: usize,
    revealed: usize,
    phase: Phase,
    config: TypingConfig,
    /// Already played before mount; rendered whole with no cursor.
    replayed: bool,
    on_complete: Option<CompletionCallback>,
}

impl TypingAnimation {
    /// Mount an animation for `key`. If the ledger says it already played,
    /// the result is complete from the start and never animates.
    pub fn mount(key: AnimationKey, text: impl Into<String>, config: TypingConfig, ledger: &mut AnimationLedger) -> Self {
        let text = text.into();
        let char_count = text.chars().count();
        let replayed = ledger.has_played(key);

        Self {
            key,
            text,
            char_count,
            revealed: if replayed { char_count } else { 0 },
            phase: if replayed {
                Phase::Done
            } else {
                Phase::Delay(config.start_delay)
            },
            config,
            replayed,
            on_complete: None,
        }
    }

    /// Run `f` once when the reveal finishes. Never runs for a replayed key.
    pub fn on_complete(mut self, f: impl FnOnce(AnimationKey) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn key(&self) -> AnimationKey {
        self.key
    }

    /// Move time forward. Returns the key when this call finished the reveal;
    /// the ledger is updated before returning.
    pub fn advance(&mut self, mut dt: Duration, ledger: &mut AnimationLedger) -> Option<AnimationKey> {
        loop {
            let remaining = match self.phase {
                Phase::Delay(rem) | Phase::Typing(rem) => rem,
                Phase::Done => return None,
            };

            if dt < remaining {
                self.phase = match self.phase {
                    Phase::Delay(_) => Phase::Delay(remaining - dt),
                    _ => Phase::Typing(remaining - dt),
                };
                return None;
            }

            dt -= remaining;
            if self.revealed < self.char_count {
                self.revealed += 1;
                let next = self.text.chars().nth(self.revealed);
                self.phase = Phase::Typing(self.config.delay_before(next));
            } else {
                self.phase = Phase::Done;
                ledger.mark_played(self.key);
                if let Some(f) = self.on_complete.take() {
                    f(self.key);
                }
                return Some(self.key);
            }
        }
    }

    /// The revealed prefix.
    pub fn visible_text(&self) -> &str {
        match self.text.char_indices().nth(self.revealed) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.phase, Phase::Typing(_))
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Done
    }

    pub fn was_replayed(&self) -> bool {
        self.replayed
    }

    pub fn cursor_visible(&self) -> bool {
        self.is_typing() || (self.config.show_cursor && self.is_complete() && !self.replayed)
    }

    /// Visible text plus the cursor, if any.
    pub fn render(&self) -> String {
        let mut out = self.visible_text().to_string();
        if self.cursor_visible() {
            out.push(CURSOR);
        }
        out
    }

    /// Total time a fresh reveal of `text` takes under `config`.
    pub fn duration_of(text: &str, config: &TypingConfig) -> Duration {
        let chars: Vec<char> = text.chars().collect();
        let mut total = config.start_delay;
        for i in 0..chars.len() {
            total += config.delay_before(chars.get(i + 1).copied());
        }
        total
    }
}

/// Outcome of asking the [`Typewriter`] to start a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// The ledger already had this key; nothing will animate.
    AlreadyPlayed,
}

/// Every running reveal on the page, plus the ledger they share.
pub struct Typewriter {
    ledger: AnimationLedger,
    active: HashMap<AnimationKey, TypingAnimation>,
}

impl Typewriter {
    pub fn new(ledger: AnimationLedger) -> Self {
        Self {
            ledger,
            active: HashMap::new(),
        }
    }

    pub fn start(&mut self, key: AnimationKey, text: impl Into<String>, config: TypingConfig) -> StartOutcome {
        if self.active.contains_key(&key) {
            return StartOutcome::AlreadyRunning;
        }
        let animation = TypingAnimation::mount(key, text, config, &mut self.ledger);
        if animation.was_replayed() {
            return StartOutcome::AlreadyPlayed;
        }
        self.active.insert(key, animation);
        StartOutcome::Started
    }

    /// Advance every running reveal; finished ones are dropped and returned.
    pub fn advance(&mut self, dt: Duration) -> Vec<AnimationKey> {
        let mut done = Vec::new();
        for animation in self.active.values_mut() {
            if let Some(key) = animation.advance(dt, &mut self.ledger) {
                done.push(key);
            }
        }
        for key in &done {
            self.active.remove(key);
        }
        done
    }

    /// Stop every running reveal of `id` and record it as played, so the
    /// text shows in full from now on. Returns the keys that were stopped.
    pub fn settle(&mut self, id: Uuid) -> Vec<AnimationKey> {
        let keys: Vec<AnimationKey> = self.active.keys().filter(|k| k.id == id).copied().collect();
        for key in &keys {
            self.active.remove(key);
            self.ledger.mark_played(*key);
        }
        keys
    }

    pub fn get(&self, key: &AnimationKey) -> Option<&TypingAnimation> {
        self.active.get(key)
    }

    /// Running reveals, in no particular order.
    pub fn active(&self) -> impl Iterator<Item = &TypingAnimation> {
        self.active.values()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }
}
