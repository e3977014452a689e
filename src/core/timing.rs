//! Per-stream duration accounting.
//!
//! Purely observational: unknown or repeated events are logged and ignored,
//! never surfaced as errors.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::{Duration, Instant};

use tracing::warn;

#[derive(Debug)]
struct Event {
    name: String,
    start: Instant,
    end: Option<Instant>,
}

impl Event {
    fn duration(&self) -> Duration {
        self.end
            .unwrap_or_else(Instant::now)
            .saturating_duration_since(self.start)
    }
}

/// Tracks several named events at once, keyed by an id (the stream name).
#[derive(Debug)]
pub struct MultiEventTimer {
    name: String,
    events: HashMap<String, Event>,
}

impl MultiEventTimer {
    /// Create a timer for the workload `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: HashMap::new(),
        }
    }

    /// Start timing `id`, displayed as `name` in reports. Restarting a
    /// running event is ignored.
    pub fn start_event(&mut self, id: &str, name: impl Into<String>) {
        if self.events.contains_key(id) {
            warn!(event = id, "Timer event already started");
            return;
        }
        self.events.insert(
            id.to_owned(),
            Event {
                name: name.into(),
                start: Instant::now(),
                end: None,
            },
        );
    }

    /// Stop timing `id`. Only the first call has an effect.
    pub fn finish_event(&mut self, id: &str) {
        match self.events.get_mut(id) {
            Some(event) if event.end.is_none() => event.end = Some(Instant::now()),
            Some(_) => warn!(event = id, "Timer event already finished"),
            None => warn!(event = id, "Timer event was never started"),
        }
    }

    /// Elapsed time per event id, sorted by id. Unfinished events report the
    /// time elapsed so far.
    #[must_use]
    pub fn durations(&self) -> Vec<(String, Duration)> {
        let mut durations: Vec<_> = self
            .events
            .iter()
            .map(|(id, event)| (id.clone(), event.duration()))
            .collect();
        durations.sort_by(|a, b| a.0.cmp(&b.0));
        durations
    }

    /// Human-readable summary, one line per event sorted by display name.
    #[must_use]
    pub fn report(&self) -> String {
        let mut events: Vec<_> = self.events.values().collect();
        events.sort_by(|a, b| a.name.cmp(&b.name));

        let width = events.iter().map(|e| e.name.len()).max().unwrap_or(0) + 2;
        let mut text = format!("{} runtimes:", self.name);
        for event in events {
            let _ = write!(
                text,
                "\n{:<width$}{:.2} seconds",
                event.name,
                event.duration().as_secs_f64()
            );
        }
        text
    }
}
