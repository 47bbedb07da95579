use std::io::Write;
use std::sync::{Arc, Mutex};

use wall_feed::animated::{AnimationKey, Field};
use wall_feed::counter::{CounterView, SubmissionCounter};
use wall_feed::feed::{FeedRow, FeedState};
use wall_feed::poller::FeedView;
use wall_feed::typing::Typewriter;

/// Rows drawn per screen.
const VIEWPORT: usize = 10;

#[derive(Default)]
struct Screen {
    counter: String,
    rows: Vec<(String, String)>,
    notice: Option<String>,
    status: Option<String>,
    scroll: usize,
}

impl Screen {
    fn draw(&self) {
        let mut out = String::new();
        out.push_str("\x1b[2J\x1b[H");
        out.push_str(&format!("💬 {} people want to make it out\n\n", self.counter));

        if let Some(notice) = &self.notice {
            out.push_str(&format!("{}\n\n", notice));
        }
        for (name, message) in self.rows.iter().skip(self.scroll).take(VIEWPORT) {
            out.push_str(&format!("{}\n  {}\n", name, message));
        }
        if self.rows.len() > VIEWPORT {
            out.push_str(&format!(
                "\n[{}-{} of {}]  /up /down to scroll\n",
                self.scroll + 1,
                (self.scroll + VIEWPORT).min(self.rows.len()),
                self.rows.len()
            ));
        }
        if let Some(status) = &self.status {
            out.push_str(&format!("\n{}\n", status));
        }
        out.push_str("\n> ");

        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(out.as_bytes());
        let _ = stdout.flush();
    }
}

/// Handle to the shared screen. The feed and the counter each draw through
/// their own clone.
#[derive(Clone, Default)]
pub struct Terminal {
    screen: Arc<Mutex<Screen>>,
}

impl Terminal {
    fn with_screen<F: FnOnce(&mut Screen)>(&self, f: F) {
        let mut screen = self.screen.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut screen);
        screen.draw();
    }

    pub fn scroll_by(&self, delta: isize) {
        self.with_screen(|screen| {
            let max = screen.rows.len().saturating_sub(VIEWPORT);
            screen.scroll = screen.scroll.saturating_add_signed(delta).min(max);
        });
    }

    pub fn set_status(&self, status: Option<String>) {
        self.with_screen(|screen| screen.status = status);
    }
}

fn field_text(row: &FeedRow, field: Field, full: String, typewriter: &Typewriter) -> String {
    if !row.animates(field) {
        return full;
    }
    let key = AnimationKey {
        id: row.submission.id,
        field,
    };
    typewriter.get(&key).map(|a| a.render()).unwrap_or_default()
}

impl FeedView for Terminal {
    fn render(&mut self, state: &FeedState, typewriter: &Typewriter) {
        let rows = state
            .rows()
            .iter()
            .map(|row| {
                let name = format!("{} →", row.submission.display_name());
                (
                    field_text(row, Field::Name, name, typewriter),
                    field_text(row, Field::Message, row.submission.message.clone(), typewriter),
                )
            })
            .collect();

        let notice = if let Some(error) = state.error() {
            Some(error.to_string())
        } else if state.is_loading() && state.rows().is_empty() {
            Some("Loading messages...".into())
        } else if state.rows().is_empty() {
            Some("No messages yet. Be the first to share your thoughts!".into())
        } else if state.has_new_messages() {
            Some("New messages".into())
        } else {
            None
        };

        self.with_screen(|screen| {
            screen.rows = rows;
            screen.notice = notice;
        });
    }

    fn scroll_offset(&self) -> usize {
        self.screen.lock().unwrap_or_else(|e| e.into_inner()).scroll
    }

    fn set_scroll_offset(&mut self, offset: usize) {
        let mut screen = self.screen.lock().unwrap_or_else(|e| e.into_inner());
        screen.scroll = offset.min(screen.rows.len().saturating_sub(VIEWPORT));
    }
}

impl CounterView for Terminal {
    fn render(&mut self, counter: &SubmissionCounter) {
        let label = counter.label();
        self.with_screen(|screen| screen.counter = label);
    }
}
