mod terminal;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use wall_feed::animated::{AnimatedSet, AnimationLedger};
use wall_feed::bus::EventBus;
use wall_feed::counter::CounterController;
use wall_feed::feed::{FeedConfig, FeedState, FirstLoad};
use wall_feed::form::SubmissionForm;
use wall_feed::poller::FeedController;
use wall_feed::source::HttpFeedSource;
use wall_feed::storage::{FileStorage, MemoryStorage, SharedStorage};
use wall_feed::typing::Typewriter;

use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout belongs to the feed.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wall_tail=info,wall_feed=warn".into()),
        )
        .init();

    let server_url = std::env::var("WALL_SERVER_URL").unwrap_or_else(|_| "http://localhost:3000".into());
    let poll_ms: i64 = std::env::var("WALL_POLL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000);
    let state_path = std::env::var("WALL_STATE_PATH").unwrap_or_else(|_| "wall-state.json".into());
    let name = std::env::var("WALL_NAME").unwrap_or_default();
    let first_load = match std::env::var("WALL_FIRST_LOAD").as_deref() {
        Ok("settle") => FirstLoad::Settle,
        _ => FirstLoad::AnimateUnseen,
    };

    let source = Arc::new(HttpFeedSource::new(&server_url)?);
    let local: SharedStorage = Arc::new(FileStorage::new(&state_path));
    let session: SharedStorage = Arc::new(MemoryStorage::new());
    let bus = EventBus::new();
    let terminal = Terminal::default();

    info!("Following {} (state in {})", server_url, state_path);

    let config = FeedConfig::default()
        .with_poll_interval_ms(poll_ms)
        .with_first_load(first_load);
    let state = FeedState::new(config, AnimatedSet::load(local.clone()), session);
    let typewriter = Typewriter::new(AnimationLedger::load(local));

    let shutdown = CancellationToken::new();
    let feed = FeedController::new(source.clone(), state, typewriter, terminal.clone(), bus.clone());
    let counter = CounterController::new(source.clone(), terminal.clone(), bus.clone());
    let feed_task = tokio::spawn(feed.run(shutdown.clone()));
    let counter_task = tokio::spawn(counter.run(shutdown.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut form = SubmissionForm::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match line.trim() {
                    "/quit" => break,
                    "/up" => terminal.scroll_by(-1),
                    "/down" => terminal.scroll_by(1),
                    _ => {
                        form.name = name.clone();
                        form.message = line;
                        let status = match form.submit(source.as_ref(), &bus).await {
                            Ok(_) => form.confirmation().map(str::to_string),
                            Err(_) => form.error().map(str::to_string),
                        };
                        terminal.set_status(status);
                    }
                }
            }
        }
    }

    shutdown.cancel();
    let _ = feed_task.await;
    let _ = counter_task.await;
    info!("Bye");

    Ok(())
}
