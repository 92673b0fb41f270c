/// Minimal event type for traceability.
///
/// Events are structured text ordered by a monotonically increasing sequence
/// number. Stages record retries, repairs and lifecycle changes here so tests
/// and diagnostics can replay what happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub sequence: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct EventBus {
    next_sequence: u64,
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.events.push(Event {
            sequence,
            kind,
            message: message.into(),
        });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.of_kind(kind).count()
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::EventBus;

    #[test]
    fn records_events_in_sequence() {
        let mut bus = EventBus::new();
        bus.emit("test", "hello");
        bus.emit("other", "world");
        assert_eq!(bus.events().len(), 2);
        assert_eq!(bus.events()[1].sequence, 1);
        assert_eq!(bus.count("test"), 1);
    }

    #[test]
    fn drain_clears_events_but_keeps_sequence() {
        let mut bus = EventBus::new();
        bus.emit("k", "m");
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());

        bus.emit("k", "n");
        assert_eq!(bus.events()[0].sequence, 1);
    }
}
