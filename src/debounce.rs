use std::time::{Duration, Instant};

/// Quiet period before an autocomplete query is sent.
pub const AUTOCOMPLETE_DELAY: Duration = Duration::from_millis(500);

/// Holds at most one pending value; scheduling a new one cancels the old.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn schedule(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// How long until the pending value is due, if any.
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, due)| due.saturating_duration_since(now))
    }

    /// Takes the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().map(|(_, due)| *due)?;
        if due > now {
            return None;
        }
        self.pending.take().map(|(value, _)| value)
    }
}
