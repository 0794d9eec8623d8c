use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Page-scoped session values the host application would otherwise expose globally.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct SessionCfg {
    /// Anti-forgery token sent with every provisioning request.
    #[serde(default)]
    pub csrf: String,
}

/// Localized strings rendered into containers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MessagesCfg {
    #[serde(default = "default_loading")]
    pub loading: String,
    #[serde(default = "default_failure")]
    pub failure: String,
    /// Label restored on the summarize control when its article header is clicked.
    #[serde(default = "default_summarize_label")]
    pub summarize_label: String,
}

impl Default for MessagesCfg {
    fn default() -> Self {
        Self {
            loading: default_loading(),
            failure: default_failure(),
            summarize_label: default_summarize_label(),
        }
    }
}

fn default_loading() -> String {
    "加载中".to_string()
}
fn default_failure() -> String {
    "请求失败 / Request Failed".to_string()
}
fn default_summarize_label() -> String {
    "Summarize".to_string()
}

/// Class names the click router matches on.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PageCfg {
    #[serde(default = "default_summarize_class")]
    pub summarize_class: String,
    #[serde(default = "default_header_class")]
    pub header_class: String,
}

impl Default for PageCfg {
    fn default() -> Self {
        Self {
            summarize_class: default_summarize_class(),
            header_class: default_header_class(),
        }
    }
}

fn default_summarize_class() -> String {
    "oai-summary-btn".to_string()
}
fn default_header_class() -> String {
    "flux_header".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HttpCfg {
    /// TCP connect timeout in milliseconds (default 5000ms)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Total request timeout in milliseconds. None = requests may hang until the peer settles.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Optional per-host idle connection pool cap (None = reqwest default)
    #[serde(default)]
    pub pool_max_idle_per_host: Option<usize>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: None,
            pool_max_idle_per_host: None,
            user_agent: default_user_agent(),
        }
    }
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}
fn default_user_agent() -> String {
    "ai-summary/0.1".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct Config {
    #[serde(default)]
    pub session: SessionCfg,
    #[serde(default)]
    pub messages: MessagesCfg,
    #[serde(default)]
    pub page: PageCfg,
    /// HTTP client configuration (timeouts, pooling). Missing → defaults.
    #[serde(default)]
    pub http: HttpCfg,
}

impl Config {
    /// Load a Config from a file path (JSON or TOML by extension). If the
    /// extension is missing or unrecognized, try JSON first, then TOML.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::error::CoreResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(crate::error::SummaryError::from)?;
        let s = std::str::from_utf8(&bytes)
            .map_err(|e| crate::error::SummaryError::Other(e.into()))?;
        let cfg: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::SummaryError::Other(e.into()))?,
            Some("toml") => toml::from_str::<Self>(s)
                .map_err(|e| crate::error::SummaryError::Other(e.into()))?,
            _ => serde_json::from_str::<Self>(s)
                .map_err(|e| crate::error::SummaryError::Other(e.into()))
                .or_else(|_| {
                    toml::from_str::<Self>(s)
                        .map_err(|e| crate::error::SummaryError::Other(e.into()))
                })?,
        };
        Ok(cfg)
    }
}
