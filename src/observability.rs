use biometrics::{Collector, Counter, Moments, Sensor};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("techbuddy.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("techbuddy.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("techbuddy.client.request_duration_seconds");

pub(crate) static STREAM_EVENTS: Counter = Counter::new("techbuddy.stream.events");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("techbuddy.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("techbuddy.stream.bytes");
pub(crate) static STREAM_FRAGMENTS: Counter = Counter::new("techbuddy.stream.fragments");

pub(crate) static CHAT_TURNS: Counter = Counter::new("techbuddy.chat.turns");
pub(crate) static CHAT_TURN_ERRORS: Counter = Counter::new("techbuddy.chat.turn_errors");
pub(crate) static CHAT_EMPTY_INPUTS: Counter = Counter::new("techbuddy.chat.empty_inputs");
pub(crate) static CHAT_TURN_DURATION: Moments =
    Moments::new("techbuddy.chat.turn_duration_seconds");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: &Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_EVENTS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_counter(&STREAM_FRAGMENTS);

    collector.register_counter(&CHAT_TURNS);
    collector.register_counter(&CHAT_TURN_ERRORS);
    collector.register_counter(&CHAT_EMPTY_INPUTS);
    collector.register_moments(&CHAT_TURN_DURATION);
}

/// Point-in-time view of the counters shown by `/stats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Requests sent to the provider.
    pub requests: u64,
    /// Requests that failed before streaming began.
    pub request_errors: u64,
    /// Stream events decoded.
    pub stream_events: u64,
    /// Bytes received on streams.
    pub stream_bytes: u64,
    /// Text fragments forwarded to the display.
    pub fragments: u64,
}

/// Read the process-wide counters.
pub fn snapshot() -> CounterSnapshot {
    CounterSnapshot {
        requests: CLIENT_REQUESTS.read(),
        request_errors: CLIENT_REQUEST_ERRORS.read(),
        stream_events: STREAM_EVENTS.read(),
        stream_bytes: STREAM_BYTES.read(),
        fragments: STREAM_FRAGMENTS.read(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reads_live_counters() {
        let before = snapshot();
        CLIENT_REQUESTS.click();
        STREAM_FRAGMENTS.click();
        let after = snapshot();
        assert!(after.requests > before.requests);
        assert!(after.fragments > before.fragments);
    }

    #[test]
    fn register_with_collector() {
        let collector = Collector::new();
        register_biometrics(&collector);
    }
}
