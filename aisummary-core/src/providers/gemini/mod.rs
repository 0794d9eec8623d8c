use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;

use crate::error::CoreResult;
use crate::http_client::HttpClient;
use crate::model::{ProviderTag, RequestDescriptor};
use crate::provider::{SummaryAdapter, auth_headers};
use crate::stream::{BoxStreamEv, StreamEvent};

/// One-shot adapter: a single JSON document, rendered in one atomic update.
#[derive(Debug, Clone)]
pub struct Gemini {
    http: HttpClient,
}

impl Gemini {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

// ---- Wire structs (minimal) ----
#[derive(Deserialize)]
struct GResp {
    #[serde(default)]
    candidates: Vec<GCandidate>,
}

#[derive(Deserialize)]
struct GCandidate {
    #[serde(default)]
    content: Option<GContent>,
}

#[derive(Deserialize)]
struct GContent {
    #[serde(default)]
    parts: Vec<GPart>,
}

#[derive(Deserialize)]
struct GPart {
    #[serde(default)]
    text: Option<String>,
}

/// First candidate's parts, newline-joined. Anything missing yields "".
fn candidate_text(resp: GResp) -> String {
    resp.candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text.unwrap_or_default())
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

#[async_trait]
impl SummaryAdapter for Gemini {
    fn tag(&self) -> ProviderTag {
        ProviderTag::Gemini
    }

    async fn open(&self, descriptor: RequestDescriptor) -> CoreResult<BoxStreamEv> {
        let body = descriptor.forwarded_body();
        let owned_headers = auth_headers(&descriptor);
        let hdrs: Vec<(&str, &str)> = owned_headers.iter().map(|(k, v)| (*k, v.as_str())).collect();

        tracing::debug!(url = descriptor.url(), "sending one-shot summary request");
        let resp: GResp = self
            .http
            .post_json(self.name(), descriptor.url(), &body, &hdrs)
            .await?;

        let text = candidate_text(resp);
        Ok(futures::stream::once(async move { StreamEvent::Finished(Some(text)) }).boxed())
    }
}
