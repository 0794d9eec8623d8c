use crate::config::PageCfg;

/// One node on a click's propagation path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub classes: Vec<String>,
    /// Id of the summary container this element belongs to, if any.
    pub container: Option<String>,
    /// Request-URL attribute carried by summarize controls.
    pub data_request: Option<String>,
}

impl Element {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn container(mut self, id: impl Into<String>) -> Self {
        self.container = Some(id.into());
        self
    }

    pub fn data_request(mut self, url: impl Into<String>) -> Self {
        self.data_request = Some(url.into());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// A click, described by its path: target first, then ancestors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickEvent {
    pub path: Vec<Element>,
}

impl ClickEvent {
    pub fn new(path: Vec<Element>) -> Self {
        Self { path }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Restore the summarize control's label.
    ResetLabel { container: String },
    Summarize { container: String },
}

/// Maps clicks to actions by class name. Stateless once built.
#[derive(Debug, Clone)]
pub struct ClickRouter {
    summarize_class: String,
    header_class: String,
}

impl ClickRouter {
    pub fn new(cfg: &PageCfg) -> Self {
        Self {
            summarize_class: cfg.summarize_class.clone(),
            header_class: cfg.header_class.clone(),
        }
    }

    /// Walk the path outward. Header hits are collected and the walk goes on;
    /// the first summarize control ends it.
    pub fn route(&self, event: &ClickEvent) -> Vec<ClickAction> {
        let mut actions = Vec::new();
        for el in &event.path {
            if el.has_class(&self.header_class) {
                if let Some(id) = &el.container {
                    actions.push(ClickAction::ResetLabel { container: id.clone() });
                }
            }
            if el.has_class(&self.summarize_class) {
                match (&el.container, &el.data_request) {
                    (Some(id), Some(_)) => actions.push(ClickAction::Summarize { container: id.clone() }),
                    _ => tracing::debug!(container = ?el.container, "summarize control without request url"),
                }
                break;
            }
        }
        actions
    }
}
