//! Click-to-summary orchestration.
//!
//! `Idle → Loading → {Error | adapter}`; the adapter's event stream then owns
//! the container until `Done` or `Error`. Nothing escapes to the caller: every
//! failure ends as an Error state plus a log line.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use reqwest::StatusCode;
use tracing_futures::Instrument;

use crate::config::{Config, MessagesCfg, SessionCfg};
use crate::error::{CoreResult, SummaryError};
use crate::http_client::HttpClient;
use crate::model::{ProviderTag, ProvisionEnvelope, ProvisionRequest, Provisioned, RequestDescriptor};
use crate::provider_factory::AdapterRegistry;
use crate::render::{CmarkRenderer, MarkdownRenderer};
use crate::stream::{BoxStreamEv, StreamEvent};
use crate::telemetry::{self, SummaryTrace};
use crate::ui::{FINISH, StateKind, SummaryContainer};

/// Name used for the provisioning hop in errors and logs.
const BACKEND: &str = "backend";

/// How a click settled. Diagnostics only; the UI already reflects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Container was busy; nothing was sent.
    Skipped,
    /// Backend refused with its own message.
    Refused,
    Done(ProviderTag),
    Failed {
        provider: Option<ProviderTag>,
        kind: &'static str,
    },
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skipped => "skipped",
            Self::Refused => "refused",
            Self::Done(_) => "done",
            Self::Failed { .. } => "failed",
        }
    }

    fn provider(&self) -> Option<ProviderTag> {
        match self {
            Self::Done(p) => Some(*p),
            Self::Failed { provider, .. } => *provider,
            Self::Skipped | Self::Refused => None,
        }
    }
}

pub struct Summarizer {
    http: HttpClient,
    session: SessionCfg,
    messages: MessagesCfg,
    registry: AdapterRegistry,
    renderer: Arc<dyn MarkdownRenderer>,
}

impl Summarizer {
    /// Production wiring: reqwest client from `cfg.http`, all three adapters,
    /// pulldown-cmark renderer.
    pub fn new(cfg: &Config) -> CoreResult<Self> {
        let http = HttpClient::new(&cfg.http)?;
        let registry = AdapterRegistry::with_defaults(http.clone());
        tracing::debug!(providers = ?registry.tags(), "summary adapters registered");
        Ok(Self::with_parts(
            http,
            cfg.session.clone(),
            cfg.messages.clone(),
            registry,
            Arc::new(CmarkRenderer::new()),
        ))
    }

    pub fn with_parts(
        http: HttpClient,
        session: SessionCfg,
        messages: MessagesCfg,
        registry: AdapterRegistry,
        renderer: Arc<dyn MarkdownRenderer>,
    ) -> Self {
        Self {
            http,
            session,
            messages,
            registry,
            renderer,
        }
    }

    pub fn messages(&self) -> &MessagesCfg {
        &self.messages
    }

    /// Handle a click on the container's summarize control.
    pub async fn on_summarize_click(&self, container: &SummaryContainer) -> Outcome {
        if !container.try_begin_loading(&self.messages.loading) {
            tracing::debug!(container = container.id(), "request already in flight, ignoring click");
            return Outcome::Skipped;
        }

        let started = Instant::now();
        let span = tracing::info_span!(
            "summary.request",
            container = %container.id(),
            provider = tracing::field::Empty,
            outcome = tracing::field::Empty,
        );

        async move {
            let (outcome, failure) = match self.run(container).await {
                Ok(provider) => (Outcome::Done(provider), None),
                Err((provider, e)) => {
                    let outcome = match &e {
                        SummaryError::BackendReported(msg) => {
                            tracing::warn!(message = %msg, "backend refused summary request");
                            Outcome::Refused
                        }
                        _ => {
                            tracing::error!(error = %e, kind = e.kind(), "summary request failed");
                            Outcome::Failed { provider, kind: e.kind() }
                        }
                    };
                    container.set_state(StateKind::Error, Some(&e.user_message(&self.messages)), None);
                    (outcome, Some(e))
                }
            };
            tracing::Span::current().record("outcome", outcome.as_str());

            let mut trace = SummaryTrace::new()
                .container(container.id())
                .provider_opt(outcome.provider().map(|p| p.as_str()))
                .outcome(outcome.as_str())
                .latency_ms(started.elapsed().as_millis() as u64);
            if let Some(e) = &failure {
                trace = trace.error_kind(e.kind()).error_message(&e.to_string());
            }
            telemetry::emit(trace);
            outcome
        }
        .instrument(span)
        .await
    }

    /// Errors carry the provider once one has been chosen.
    async fn run(&self, container: &SummaryContainer) -> Result<ProviderTag, (Option<ProviderTag>, SummaryError)> {
        let url = container
            .request_url()
            .ok_or_else(|| (None, SummaryError::Validation("control has no request url".into())))?;

        match self.provision(url).await.map_err(|e| (None, e))? {
            Provisioned::Refused(msg) => Err((None, SummaryError::BackendReported(msg))),
            Provisioned::Dispatch { provider, descriptor } => {
                tracing::Span::current().record("provider", provider.as_str());
                self.dispatch(container, provider, descriptor)
                    .await
                    .map_err(|e| (Some(provider), e))?;
                Ok(provider)
            }
        }
    }

    /// POST the anti-forgery envelope and validate the answer.
    async fn provision(&self, url: &str) -> CoreResult<Provisioned> {
        let body = ProvisionRequest {
            ajax: true,
            csrf: &self.session.csrf,
        };
        tracing::debug!(url, "requesting summary descriptor");
        let resp = self.http.post(BACKEND, url, &body, &[]).await?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Err(SummaryError::Provisioning(format!("unexpected status {status}")));
        }
        let envelope: ProvisionEnvelope = resp
            .json()
            .await
            .map_err(|e| SummaryError::Provisioning(format!("unreadable envelope: {e}")))?;
        envelope.into_provisioned()
    }

    async fn dispatch(
        &self,
        container: &SummaryContainer,
        provider: ProviderTag,
        descriptor: RequestDescriptor,
    ) -> CoreResult<()> {
        let adapter = self.registry.select(provider)?;
        let events = adapter.open(descriptor).await?;
        self.drive(container, events).await
    }

    /// Fold adapter events into container updates, strictly in arrival order.
    /// A stream that ends without a terminal event is treated as finished.
    pub async fn drive(&self, container: &SummaryContainer, mut events: BoxStreamEv) -> CoreResult<()> {
        let mut ticks = 0usize;
        while let Some(ev) = events.next().await {
            match ev {
                StreamEvent::Replace(text) => {
                    ticks += 1;
                    let html = self.renderer.render(&text);
                    container.set_state(StateKind::Idle, None, Some(&html));
                }
                StreamEvent::Finished(Some(text)) => {
                    let html = self.renderer.render(&text);
                    container.set_state(StateKind::Idle, Some(FINISH), Some(&html));
                    tracing::debug!(ticks, "summary finished");
                    return Ok(());
                }
                StreamEvent::Finished(None) => break,
                StreamEvent::Error(e) => return Err(e),
            }
        }
        container.set_state(StateKind::Idle, Some(FINISH), None);
        tracing::debug!(ticks, "summary finished");
        Ok(())
    }
}
