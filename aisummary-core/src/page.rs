//! A page of summary containers with a single delegated click handler.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use crate::config::Config;
use crate::router::{ClickAction, ClickEvent, ClickRouter};
use crate::summarizer::{Outcome, Summarizer};
use crate::ui::SummaryContainer;

#[derive(Clone)]
pub struct Page {
    containers: Arc<HashMap<String, Arc<SummaryContainer>>>,
    router: Arc<ClickRouter>,
    summarizer: Arc<Summarizer>,
    label: Arc<str>,
}

impl Page {
    pub fn new(cfg: &Config, summarizer: Arc<Summarizer>, containers: Vec<SummaryContainer>) -> Self {
        let containers = containers
            .into_iter()
            .map(|c| (c.id().to_string(), Arc::new(c)))
            .collect();
        Self {
            containers: Arc::new(containers),
            router: Arc::new(ClickRouter::new(&cfg.page)),
            summarizer,
            label: Arc::from(cfg.messages.summarize_label.as_str()),
        }
    }

    pub fn container(&self, id: &str) -> Option<Arc<SummaryContainer>> {
        self.containers.get(id).cloned()
    }

    /// Route one click and run whatever it triggers. Label resets apply
    /// immediately; summaries for distinct containers run concurrently.
    pub async fn handle_click(&self, event: &ClickEvent) -> Vec<Outcome> {
        let mut pending = Vec::new();
        for action in self.router.route(event) {
            match action {
                ClickAction::ResetLabel { container } => {
                    if let Some(c) = self.lookup(&container) {
                        c.reset_label(&self.label);
                    }
                }
                ClickAction::Summarize { container } => {
                    if let Some(c) = self.lookup(&container) {
                        pending.push(c);
                    }
                }
            }
        }
        join_all(pending.iter().map(|c| self.summarizer.on_summarize_click(c))).await
    }

    /// Handle a click on a background task, as an event loop would.
    pub fn spawn_click(&self, event: ClickEvent) -> tokio::task::JoinHandle<Vec<Outcome>> {
        let page = self.clone();
        tokio::spawn(async move { page.handle_click(&event).await })
    }

    fn lookup(&self, id: &str) -> Option<&Arc<SummaryContainer>> {
        let found = self.containers.get(id);
        if found.is_none() {
            tracing::warn!(container = id, "click routed to unknown container");
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionCfg;
    use crate::router::Element;
    use crate::ui::UiState;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;
    use std::time::Duration;

    fn page(server: &MockServer, ids: &[&str]) -> Page {
        let cfg = Config {
            session: SessionCfg { csrf: "t".into() },
            ..Config::default()
        };
        let summarizer = Arc::new(Summarizer::new(&cfg).expect("summarizer"));
        let containers = ids
            .iter()
            .map(|id| SummaryContainer::new(*id, Some(format!("{}/summary/{id}", server.base_url())), "Summarized"))
            .collect();
        Page::new(&cfg, summarizer, containers)
    }

    fn button(server: &MockServer, id: &str) -> ClickEvent {
        ClickEvent::new(vec![
            Element::new()
                .class("oai-summary-btn")
                .container(id)
                .data_request(format!("{}/summary/{id}", server.base_url())),
        ])
    }

    fn refuse<'a>(server: &'a MockServer, id: &str, delay_ms: u64) -> httpmock::Mock<'a> {
        let path = format!("/summary/{id}");
        let msg = format!("no key for {id}");
        server.mock(move |when, then| {
            when.method(POST).path(path.as_str());
            then.status(200)
                .delay(Duration::from_millis(delay_ms))
                .json_body(json!({"response": {"error": true, "data": msg}}));
        })
    }

    #[tokio::test]
    async fn click_runs_summary_for_its_container() {
        let server = MockServer::start();
        let m = refuse(&server, "a", 0);
        let p = page(&server, &["a", "b"]);

        assert_eq!(p.handle_click(&button(&server, "a")).await, vec![Outcome::Refused]);
        m.assert();
        assert_eq!(p.container("a").unwrap().state(), UiState::Error("no key for a".into()));
        assert_eq!(p.container("b").unwrap().state(), UiState::Idle);
    }

    #[tokio::test]
    async fn header_click_restores_label_without_requests() {
        let server = MockServer::start();
        let m = refuse(&server, "a", 0);
        let p = page(&server, &["a"]);
        let ev = ClickEvent::new(vec![Element::new().class("flux_header").container("a")]);

        assert!(p.handle_click(&ev).await.is_empty());
        assert_eq!(p.container("a").unwrap().snapshot().control_label, "Summarize");
        m.assert_hits(0);
    }

    #[tokio::test]
    async fn unknown_container_is_ignored() {
        let server = MockServer::start();
        let p = page(&server, &["a"]);
        assert!(p.handle_click(&button(&server, "ghost")).await.is_empty());
        assert!(p.container("ghost").is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn distinct_containers_run_concurrently() {
        let server = MockServer::start();
        let ma = refuse(&server, "a", 150);
        let mb = refuse(&server, "b", 150);
        let p = page(&server, &["a", "b"]);

        let ha = p.spawn_click(button(&server, "a"));
        let hb = p.spawn_click(button(&server, "b"));
        // a second click on a busy container goes nowhere
        tokio::time::sleep(Duration::from_millis(30)).await;
        let again = p.handle_click(&button(&server, "a")).await;

        assert_eq!(again, vec![Outcome::Skipped]);
        assert_eq!(ha.await.unwrap(), vec![Outcome::Refused]);
        assert_eq!(hb.await.unwrap(), vec![Outcome::Refused]);
        ma.assert_hits(1);
        mb.assert_hits(1);
        assert_eq!(p.container("b").unwrap().state(), UiState::Error("no key for b".into()));
    }
}
