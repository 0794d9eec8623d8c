use std::{collections::HashMap, sync::Arc};

use crate::error::{CoreResult, SummaryError};
use crate::http_client::HttpClient;
use crate::model::ProviderTag;
use crate::provider::SummaryAdapter;
use crate::providers::{gemini::Gemini, ollama::Ollama, openai::OpenAI};

/// Registry of adapter instances keyed by provider tag.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ProviderTag, Arc<dyn SummaryAdapter>>,
}

impl AdapterRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// All three wire formats, sharing one HTTP client.
    pub fn with_defaults(http: HttpClient) -> Self {
        let mut reg = Self::empty();
        reg.register(Arc::new(OpenAI::new(http.clone())));
        reg.register(Arc::new(Ollama::new(http.clone())));
        reg.register(Arc::new(Gemini::new(http)));
        reg
    }

    /// Register (or replace) the adapter for its own tag.
    pub fn register(&mut self, adapter: Arc<dyn SummaryAdapter>) {
        self.adapters.insert(adapter.tag(), adapter);
    }

    pub fn select(&self, tag: ProviderTag) -> CoreResult<Arc<dyn SummaryAdapter>> {
        self.adapters
            .get(&tag)
            .cloned()
            .ok_or_else(|| SummaryError::UnknownProvider(tag.to_string()))
    }

    pub fn tags(&self) -> Vec<ProviderTag> {
        let mut tags: Vec<ProviderTag> = self.adapters.keys().copied().collect();
        tags.sort_by_key(|t| t.as_str());
        tags
    }
}
