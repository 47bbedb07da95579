use tokio::sync::broadcast;

use wall_types::events::WallEvent;

/// In-process notification bus between the form, the feed and the counter.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<WallEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WallEvent> {
        self.tx.subscribe()
    }

    /// Deliver to every current subscriber. Nobody listening is fine.
    pub fn publish(&self, event: WallEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_events() {
        let bus = EventBus::new();
        let mut feed = bus.subscribe();
        let mut counter = bus.subscribe();

        bus.publish(WallEvent::MessageUpdated);
        bus.publish(WallEvent::SubmissionCountUpdated);

        assert_eq!(feed.recv().await.unwrap(), WallEvent::MessageUpdated);
        assert_eq!(counter.recv().await.unwrap(), WallEvent::MessageUpdated);
        assert_eq!(counter.recv().await.unwrap(), WallEvent::SubmissionCountUpdated);
    }
}
