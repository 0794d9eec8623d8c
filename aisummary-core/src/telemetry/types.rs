use serde::{Deserialize, Serialize};

/// Provider-agnostic record of one summary request, emitted when it settles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SummaryTrace {
    /// Container the request belonged to.
    pub container_id: Option<String>,

    /// Provider tag from the descriptor, if provisioning got that far.
    pub provider: Option<String>,

    /// "done", "refused" or "failed".
    pub outcome: Option<String>,

    /// Elapsed time from click to terminal tick.
    pub latency_ms: Option<u64>,

    /// Optional error metadata, if applicable.
    pub error_kind: Option<String>,
    pub error_message: Option<String>,
}

impl SummaryTrace {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn container(mut self, id: &str) -> Self {
        self.container_id = Some(id.to_string());
        self
    }
    pub fn provider_opt(mut self, provider: Option<&str>) -> Self {
        self.provider = provider.map(|s| s.to_string());
        self
    }
    pub fn outcome(mut self, outcome: &str) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }
    pub fn latency_ms(mut self, ms: u64) -> Self {
        self.latency_ms = Some(ms);
        self
    }
    pub fn error_kind(mut self, kind: &str) -> Self {
        self.error_kind = Some(kind.to_string());
        self
    }
    pub fn error_message(mut self, msg: &str) -> Self {
        self.error_message = Some(msg.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn summary_trace_serializes() {
        let trace = SummaryTrace::new()
            .container("entry-9")
            .provider_opt(Some("ollama"))
            .outcome("failed")
            .latency_ms(42)
            .error_kind("upstream_http");

        let as_json = serde_json::to_value(&trace).unwrap();
        assert_eq!(as_json["container_id"], json!("entry-9"));
        assert_eq!(as_json["provider"], json!("ollama"));
        assert_eq!(as_json["latency_ms"], json!(42));
        assert_eq!(as_json["error_kind"], json!("upstream_http"));
        assert_eq!(as_json["error_message"], json!(null));
    }
}
