//! Telemetry primitives for summary requests.
//! By default, no telemetry is emitted unless a sink is installed via `set_telemetry_sink`.

pub mod types;
#[cfg(test)]
pub mod test_span;

pub use types::*;

use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Implement this to receive one trace per finished summary request.
///
/// Requirements:
/// - Implementations must be thread-safe (`Send + Sync`) and `'static`.
/// - `record` **may** be called from any thread; implementations should avoid panicking.
pub trait TelemetrySink: Send + Sync + 'static {
    fn record(&self, trace: SummaryTrace);
}

static TELEMETRY_SINK: OnceCell<Arc<dyn TelemetrySink>> = OnceCell::new();

// In tests, gate emission to only the calling test thread to avoid cross-test interference.
#[cfg(test)]
thread_local! {
    static TEST_CAPTURE: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Install a global telemetry sink. Returns `false` if a sink is already installed.
///
/// This is a write-once global for the process lifetime (backed by `OnceCell`).
pub fn set_telemetry_sink(sink: Arc<dyn TelemetrySink>) -> bool {
    TELEMETRY_SINK.set(sink).is_ok()
}

/// Emit a trace if a sink is installed.
///
/// In tests, emission is suppressed unless explicitly enabled via `test_set_capture_enabled`.
#[inline]
pub(crate) fn emit(trace: SummaryTrace) {
    #[cfg(test)]
    {
        if !TEST_CAPTURE.with(|c| c.get()) {
            return;
        }
    }
    if let Some(sink) = TELEMETRY_SINK.get() {
        sink.record(trace);
    }
}

#[cfg(test)]
/// Test-only helper: enable or disable capture for the current test thread.
pub fn test_set_capture_enabled(enabled: bool) {
    TEST_CAPTURE.with(|c| c.set(enabled));
}

#[cfg(test)]
/// Test-only shared sink. The global can only be set once per process, so
/// every test goes through this one and filters by container id.
pub fn test_sink() -> Arc<CollectingSink> {
    static SINK: OnceCell<Arc<CollectingSink>> = OnceCell::new();
    SINK.get_or_init(|| {
        let sink = Arc::new(CollectingSink::default());
        set_telemetry_sink(sink.clone());
        sink
    })
    .clone()
}

#[cfg(test)]
#[derive(Default)]
pub struct CollectingSink {
    pub traces: parking_lot::Mutex<Vec<SummaryTrace>>,
}

#[cfg(test)]
impl CollectingSink {
    pub fn for_container(&self, id: &str) -> Vec<SummaryTrace> {
        self.traces
            .lock()
            .iter()
            .filter(|t| t.container_id.as_deref() == Some(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
impl TelemetrySink for CollectingSink {
    fn record(&self, trace: SummaryTrace) {
        self.traces.lock().push(trace);
    }
}
