use async_trait::async_trait;

use crate::error::CoreResult;
use crate::model::{ProviderTag, RequestDescriptor};
use crate::stream::BoxStreamEv;

/// One upstream wire format.
///
/// `open` issues the upstream request and returns the lazily-decoded event
/// stream. Failures before the first byte (transport, non-2xx) come back as
/// `Err`; failures while reading surface as a terminal `StreamEvent::Error`.
#[async_trait]
pub trait SummaryAdapter: Send + Sync {
    fn tag(&self) -> ProviderTag;

    fn name(&self) -> &str {
        self.tag().as_str()
    }

    async fn open(&self, descriptor: RequestDescriptor) -> CoreResult<BoxStreamEv>;
}

/// `Authorization` header value list shared by every adapter.
pub(crate) fn auth_headers(descriptor: &RequestDescriptor) -> [(&'static str, String); 1] {
    [("Authorization", descriptor.bearer())]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::stream::StreamEvent;
    use futures::StreamExt;
    use parking_lot::Mutex;

    /// Adapter replaying canned events; records every descriptor url it was opened with.
    pub(crate) struct ScriptedAdapter {
        pub tag: ProviderTag,
        pub script: Mutex<Option<Vec<StreamEvent>>>,
        pub opened: Mutex<Vec<String>>,
    }

    impl ScriptedAdapter {
        pub(crate) fn new(tag: ProviderTag, script: Vec<StreamEvent>) -> Self {
            Self {
                tag,
                script: Mutex::new(Some(script)),
                opened: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SummaryAdapter for ScriptedAdapter {
        fn tag(&self) -> ProviderTag {
            self.tag
        }

        async fn open(&self, descriptor: RequestDescriptor) -> CoreResult<BoxStreamEv> {
            self.opened.lock().push(descriptor.url().to_string());
            let events = self.script.lock().take().unwrap_or_default();
            Ok(futures::stream::iter(events).boxed())
        }
    }

    #[tokio::test]
    async fn scripted_adapter_replays_once() {
        let adapter = ScriptedAdapter::new(ProviderTag::Gemini, vec![StreamEvent::Finished(Some("x".into()))]);
        assert_eq!(adapter.name(), "gemini");
        let desc = RequestDescriptor::from_value(serde_json::json!({"oai_url": "http://u"})).unwrap();
        let events: Vec<StreamEvent> = adapter.open(desc).await.unwrap().collect().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_text(), Some("x"));
        assert_eq!(adapter.opened.lock().as_slice(), ["http://u".to_string()]);
    }
}
