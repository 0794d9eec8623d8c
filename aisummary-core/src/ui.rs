//! Per-article summary container and the state controller that drives it.
//!
//! A container owns one summarize control and one content region. Every state
//! change goes through [`SummaryContainer::set_state`], which is also the only
//! place that notifies the attached [`ContainerObserver`].

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::render::status_to_html;

/// Status sentinel marking the terminal tick of a request.
pub const FINISH: &str = "finish";

/// Status signal passed to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Loading,
    Error,
    /// Streaming tick, or the terminal tick when the status is [`FINISH`].
    Idle,
}

/// Observable lifecycle of a container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UiState {
    #[default]
    Idle,
    Loading(String),
    Error(String),
    Streaming(String),
    Done,
}

/// Everything a surface needs to paint a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSnapshot {
    pub busy: bool,
    pub errored: bool,
    pub control_disabled: bool,
    pub control_label: String,
    pub content_html: String,
    pub state: UiState,
}

/// Receives a snapshot after every state change, in application order.
/// Called with the container lock held; must not call back into the container.
pub trait ContainerObserver: Send + Sync {
    fn on_update(&self, container_id: &str, snapshot: &ContainerSnapshot);
}

pub struct SummaryContainer {
    id: String,
    request_url: Option<String>,
    inner: Mutex<ContainerSnapshot>,
    observer: Option<Arc<dyn ContainerObserver>>,
}

impl fmt::Debug for SummaryContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummaryContainer")
            .field("id", &self.id)
            .field("request_url", &self.request_url)
            .field("state", &self.inner.lock().state)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl SummaryContainer {
    pub fn new(id: impl Into<String>, request_url: Option<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            request_url,
            inner: Mutex::new(ContainerSnapshot {
                busy: false,
                errored: false,
                control_disabled: false,
                control_label: label.into(),
                content_html: String::new(),
                state: UiState::Idle,
            }),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ContainerObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The control's request-URL attribute.
    pub fn request_url(&self) -> Option<&str> {
        self.request_url.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.lock().busy
    }

    pub fn state(&self) -> UiState {
        self.inner.lock().state.clone()
    }

    pub fn snapshot(&self) -> ContainerSnapshot {
        self.inner.lock().clone()
    }

    /// Apply a status signal.
    ///
    /// `rendered_html`, when present, replaces the content verbatim; otherwise
    /// the status text (if any) is escaped and shown with `<br>` line breaks.
    pub fn set_state(&self, kind: StateKind, status: Option<&str>, rendered_html: Option<&str>) {
        let mut s = self.inner.lock();
        Self::apply(&mut s, kind, status, rendered_html);
        self.notify(&s);
    }

    /// Busy check and Loading transition under one lock. Returns `false`
    /// (and changes nothing) when a request is already in flight.
    ///
    /// Streaming ticks clear `busy` but keep the control disabled, and a
    /// disabled control takes no clicks, so both flags are checked.
    pub fn try_begin_loading(&self, message: &str) -> bool {
        let mut s = self.inner.lock();
        if s.busy || s.control_disabled {
            return false;
        }
        Self::apply(&mut s, StateKind::Loading, Some(message), None);
        self.notify(&s);
        true
    }

    /// Restore the control label (the article header was clicked).
    pub fn reset_label(&self, label: &str) {
        let mut s = self.inner.lock();
        if s.control_label != label {
            s.control_label = label.to_string();
            self.notify(&s);
        }
    }

    fn apply(s: &mut ContainerSnapshot, kind: StateKind, status: Option<&str>, rendered_html: Option<&str>) {
        match kind {
            StateKind::Loading => {
                s.busy = true;
                s.errored = false;
                s.control_disabled = true;
                s.content_html = status.map(status_to_html).unwrap_or_default();
            }
            StateKind::Error => {
                s.busy = false;
                s.errored = true;
                s.control_disabled = false;
                s.content_html = status.map(status_to_html).unwrap_or_default();
            }
            StateKind::Idle => {
                s.busy = false;
                s.errored = false;
                if status == Some(FINISH) {
                    s.control_disabled = false;
                }
            }
        }

        if let Some(html) = rendered_html {
            s.content_html = html.to_string();
        }

        s.state = match kind {
            StateKind::Loading => UiState::Loading(s.content_html.clone()),
            StateKind::Error => UiState::Error(s.content_html.clone()),
            StateKind::Idle if status == Some(FINISH) => UiState::Done,
            StateKind::Idle if s.control_disabled => UiState::Streaming(s.content_html.clone()),
            StateKind::Idle => UiState::Idle,
        };
    }

    fn notify(&self, s: &ContainerSnapshot) {
        if let Some(obs) = &self.observer {
            obs.on_update(&self.id, s);
        }
    }
}
