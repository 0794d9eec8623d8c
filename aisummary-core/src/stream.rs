//! Streaming primitives produced by provider adapters.
//!
//! Contract:
//! - Adapters emit 0..n `Replace` events, each carrying the full markdown to display.
//! - The stream **must** terminate with exactly one terminal event: `Finished` or `Error`.
//! - After a terminal event, no further events are emitted.
//!
//! Whether `Replace` carries a running accumulation or only the latest chunk is
//! decided by the adapter's wire format, not by the consumer.

/// What the orchestrator receives incrementally.
#[derive(Debug)]
pub enum StreamEvent {
    /// Markdown that should now fill the content region.
    Replace(String),
    /// Upstream is done. One-shot adapters carry their only payload here.
    Finished(Option<String>),
    /// Transport/parse error surfaced mid-stream; stream ends after this.
    Error(crate::error::SummaryError),
}

impl StreamEvent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Replace(s) => Some(s.as_str()),
            Self::Finished(s) => s.as_deref(),
            Self::Error(_) => None,
        }
    }
}

/// Boxed stream of summary events. Every adapter returns this.
pub type BoxStreamEv = futures::stream::BoxStream<'static, StreamEvent>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_text_exposes_display_payload() {
        assert_eq!(StreamEvent::Replace("hi".into()).as_text(), Some("hi"));
        assert_eq!(StreamEvent::Finished(Some("done".into())).as_text(), Some("done"));
        assert_eq!(StreamEvent::Finished(None).as_text(), None);

        let e = StreamEvent::Error(crate::error::SummaryError::Validation("x".into()));
        assert_eq!(e.as_text(), None);
    }
}
