use gdbridge_protocol::{unix_now_secs, EventRecord};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

pub const EVENT_HISTORY_LIMIT: usize = 200;
const BROADCAST_CAPACITY: usize = 64;

pub const EVENT_KIND_LOG: &str = "log";
pub const EVENT_KIND_PHASE: &str = "phase";

/// Recent bridge activity: a bounded history for polling plus a broadcast for live listeners.
///
/// Publishing never fails; with no subscribers the broadcast is simply dropped.
pub struct EventStream {
    history: Mutex<VecDeque<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStream {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            history: Mutex::new(VecDeque::with_capacity(EVENT_HISTORY_LIMIT)),
            sender,
        }
    }

    pub fn publish(&self, kind: &str, message: impl Into<String>) -> EventRecord {
        let record = EventRecord {
            kind: kind.to_string(),
            message: message.into(),
            timestamp: unix_now_secs(),
        };
        match self.history.lock() {
            Ok(mut history) => push_bounded(&mut history, record.clone()),
            Err(poisoned) => push_bounded(&mut poisoned.into_inner(), record.clone()),
        }
        if self.sender.send(record.clone()).is_err() {
            log::trace!("No event subscribers");
        }
        record
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Oldest first.
    pub fn recent(&self) -> Vec<EventRecord> {
        match self.history.lock() {
            Ok(history) => history.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }
}

fn push_bounded(history: &mut VecDeque<EventRecord>, record: EventRecord) {
    history.push_back(record);
    while history.len() > EVENT_HISTORY_LIMIT {
        history.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_last_two_hundred() {
        let events = EventStream::new();
        for i in 0..250 {
            events.publish(EVENT_KIND_LOG, format!("line {i}"));
        }
        let recent = events.recent();
        assert_eq!(recent.len(), EVENT_HISTORY_LIMIT);
        assert_eq!(recent[0].message, "line 50");
        assert_eq!(recent[EVENT_HISTORY_LIMIT - 1].message, "line 249");
    }

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let events = EventStream::new();
        let mut rx = events.subscribe();
        events.publish(EVENT_KIND_PHASE, "Phase 2 started");
        let record = rx.recv().await.unwrap();
        assert_eq!(record.kind, "phase");
        assert_eq!(record.message, "Phase 2 started");
    }
}
