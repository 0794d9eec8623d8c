use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::error::CoreResult;
use crate::http_client::{ByteStream, HttpClient, LineStream, LineStreamBox};
use crate::model::{ProviderTag, RequestDescriptor};
use crate::provider::{SummaryAdapter, auth_headers};
use crate::stream::{BoxStreamEv, StreamEvent};

/// Line-stream adapter: newline-delimited JSON, `response` fields accumulate.
///
/// Unlike the other adapters the full descriptor, credentials included, is
/// posted as the body; this upstream expects it that way.
#[derive(Debug, Clone)]
pub struct Ollama {
    http: HttpClient,
}

impl Ollama {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[derive(Deserialize)]
struct OLine {
    #[serde(default)]
    response: Option<serde_json::Value>,
}

impl OLine {
    /// Only string fragments carry text; absent, null or other values count as empty.
    fn fragment(&self) -> &str {
        match &self.response {
            Some(serde_json::Value::String(s)) => s,
            _ => "",
        }
    }
}

/// Fold delimited JSON lines into a running text, one `Replace` per line.
/// Malformed lines are logged and skipped.
pub fn line_events(bytes: ByteStream) -> BoxStreamEv {
    let lines: LineStreamBox = LineStream::boxed(bytes);
    futures::stream::unfold(Some((lines, String::new())), |state| async move {
        let Some((mut lines, mut text)) = state else {
            return None;
        };
        loop {
            match lines.next().await {
                Some(Ok(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<OLine>(line) {
                        Ok(parsed) => {
                            text.push_str(parsed.fragment());
                            let snapshot = text.clone();
                            return Some((StreamEvent::Replace(snapshot), Some((lines, text))));
                        }
                        Err(e) => {
                            tracing::warn!(provider = "ollama", error = %e, line, "skipping malformed line");
                            continue;
                        }
                    }
                }
                Some(Err(e)) => return Some((StreamEvent::Error(e), None)),
                None => return Some((StreamEvent::Finished(None), None)),
            }
        }
    })
    .boxed()
}

#[async_trait]
impl SummaryAdapter for Ollama {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Ollama
    }

    async fn open(&self, descriptor: RequestDescriptor) -> CoreResult<BoxStreamEv> {
        let owned_headers = auth_headers(&descriptor);
        let hdrs: Vec<(&str, &str)> = owned_headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        tracing::debug!(url = descriptor.url(), "opening line stream");
        let bytes = self
            .http
            .post_stream(self.name(), descriptor.url(), descriptor.full_body(), &hdrs)
            .await?;
        Ok(line_events(bytes))
    }
}
