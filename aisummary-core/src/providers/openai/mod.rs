use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::error::{CoreResult, SummaryError};
use crate::http_client::{ByteStream, HttpClient, Utf8Decoder};
use crate::model::{ProviderTag, RequestDescriptor};
use crate::provider::{SummaryAdapter, auth_headers};
use crate::stream::{BoxStreamEv, StreamEvent};

/// Chunk-stream adapter: every transport read is one complete JSON object.
///
/// Each chunk *replaces* the displayed text; nothing is accumulated. This
/// differs from the line-delimited adapter and is kept until the product side
/// decides which behavior is intended.
#[derive(Debug, Clone)]
pub struct OpenAI {
    http: HttpClient,
}

impl OpenAI {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

// ---- Wire structs (minimal) ----
#[derive(Deserialize)]
struct OAChunk {
    choices: Vec<OAChoice>,
}

#[derive(Deserialize)]
struct OAChoice {
    #[serde(default)]
    message: Option<OAMessage>,
}

#[derive(Deserialize)]
struct OAMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chunk_text(raw: &str) -> CoreResult<String> {
    let chunk: OAChunk = serde_json::from_str(raw).map_err(|e| SummaryError::StreamDecode {
        provider: ProviderTag::OpenAi.to_string(),
        message: format!("chunk is not a JSON object: {e}"),
    })?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}

/// Decode one JSON object per read into latest-wins `Replace` events.
pub fn chunk_events(bytes: ByteStream) -> BoxStreamEv {
    futures::stream::unfold(Some((bytes, Utf8Decoder::new())), |state| async move {
        let Some((mut bytes, mut decoder)) = state else {
            return None;
        };
        loop {
            match bytes.next().await {
                Some(Ok(chunk)) => {
                    let raw = decoder.decode(&chunk);
                    // keep-alive whitespace carries no object
                    if raw.trim().is_empty() {
                        continue;
                    }
                    tracing::debug!(provider = "openai", bytes = chunk.len(), "received chunk");
                    return match chunk_text(&raw) {
                        Ok(text) => Some((StreamEvent::Replace(text), Some((bytes, decoder)))),
                        Err(e) => Some((StreamEvent::Error(e), None)),
                    };
                }
                Some(Err(e)) => return Some((StreamEvent::Error(e), None)),
                None => {
                    // bytes held back as an incomplete character can only be a truncated chunk
                    if decoder.finish().is_empty() {
                        return Some((StreamEvent::Finished(None), None));
                    }
                    let e = SummaryError::StreamDecode {
                        provider: ProviderTag::OpenAi.to_string(),
                        message: "stream ended inside a character".into(),
                    };
                    return Some((StreamEvent::Error(e), None));
                }
            }
        }
    })
    .boxed()
}

#[async_trait]
impl SummaryAdapter for OpenAI {
    fn tag(&self) -> ProviderTag {
        ProviderTag::OpenAi
    }

    async fn open(&self, descriptor: RequestDescriptor) -> CoreResult<BoxStreamEv> {
        let body = descriptor.forwarded_body();
        let owned_headers = auth_headers(&descriptor);
        let hdrs: Vec<(&str, &str)> = owned_headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        tracing::debug!(url = descriptor.url(), "opening chunk stream");
        let bytes = self
            .http
            .post_stream(self.name(), descriptor.url(), &body, &hdrs)
            .await?;
        Ok(chunk_events(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;

    fn reads(parts: Vec<&'static str>) -> ByteStream {
        Box::pin(futures::stream::iter(
            parts.into_iter().map(|p| Ok(Bytes::from_static(p.as_bytes()))).collect::<Vec<_>>(),
        ))
    }

    fn texts(events: &[StreamEvent]) -> Vec<Option<&str>> {
        events.iter().map(|e| e.as_text()).collect()
    }

    #[tokio::test]
    async fn latest_chunk_wins() {
        let events: Vec<StreamEvent> = chunk_events(reads(vec![
            r#"{"choices":[{"message":{"content":"First draft"}}]}"#,
            r#"{"choices":[{"message":{"content":"Second"}}]}"#,
        ]))
        .collect()
        .await;
        assert_eq!(texts(&events), vec![Some("First draft"), Some("Second"), None]);
        assert!(matches!(events[0], StreamEvent::Replace(_)));
        assert!(matches!(events[2], StreamEvent::Finished(None)));
    }

    #[tokio::test]
    async fn missing_content_renders_empty() {
        let events: Vec<StreamEvent> = chunk_events(reads(vec![
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
        ]))
        .collect()
        .await;
        assert_eq!(texts(&events), vec![Some(""), Some(""), None]);
    }

    #[tokio::test]
    async fn malformed_chunk_is_fatal() {
        let events: Vec<StreamEvent> = chunk_events(reads(vec![
            r#"{"choices":[{"message":{"content":"ok"}}]}"#,
            "data: not json",
            r#"{"choices":[{"message":{"content":"never seen"}}]}"#,
        ]))
        .collect()
        .await;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[1], StreamEvent::Error(SummaryError::StreamDecode { .. })));

        // object without `choices` cannot be indexed either
        let events: Vec<StreamEvent> = chunk_events(reads(vec![r#"{"error":"x"}"#])).collect().await;
        assert!(matches!(events[0], StreamEvent::Error(_)));
    }

    #[tokio::test]
    async fn whitespace_only_read_is_skipped() {
        let events: Vec<StreamEvent> = chunk_events(reads(vec![
            r#"{"choices":[{"message":{"content":"a"}}]}"#,
            "\n",
            "  \r\n",
            r#"{"choices":[{"message":{"content":"b"}}]}"#,
        ]))
        .collect()
        .await;
        assert_eq!(texts(&events), vec![Some("a"), Some("b"), None]);
    }

    #[tokio::test]
    async fn truncated_character_at_end_is_fatal() {
        let parts: Vec<CoreResult<Bytes>> = vec![
            Ok(Bytes::from_static(br#"{"choices":[{"message":{"content":"ok"}}]}"#)),
            Ok(Bytes::from_static(b"\xe6\x91")),
        ];
        let events: Vec<StreamEvent> = chunk_events(Box::pin(futures::stream::iter(parts))).collect().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].as_text(), Some("ok"));
        match &events[1] {
            StreamEvent::Error(SummaryError::StreamDecode { message, .. }) => {
                assert!(message.contains("inside a character"), "{message}")
            }
            other => panic!("expected StreamDecode, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn open_posts_stripped_body_with_bearer() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body(json!({"model": "gpt-4o-mini", "stream": true}));
            then.status(200)
                .body(r#"{"choices":[{"message":{"content":"Sum"}}]}"#);
        });
        let desc = RequestDescriptor::from_value(json!({
            "oai_url": format!("{}/v1/chat/completions", server.base_url()),
            "oai_key": "sk-test",
            "model": "gpt-4o-mini",
            "stream": true
        }))
        .unwrap();

        let adapter = OpenAI::new(HttpClient::new_default().unwrap());
        let events: Vec<StreamEvent> = adapter.open(desc).await.expect("open").collect().await;
        m.assert();
        assert_eq!(texts(&events), vec![Some("Sum"), None]);
    }
}
