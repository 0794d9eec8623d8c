use std::fmt;
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreResult, SummaryError};

/// Descriptor key carrying the upstream endpoint.
pub const URL_FIELD: &str = "oai_url";
/// Descriptor key carrying the short-lived bearer credential.
pub const KEY_FIELD: &str = "oai_key";

/// Upstream wire formats the widget knows how to consume.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    /// One JSON object per transport read, latest chunk wins.
    OpenAi,
    /// Newline-delimited JSON, `response` fields accumulate.
    Ollama,
    /// Single JSON document with candidates.
    Gemini,
}

impl ProviderTag {
    pub const ALL: [ProviderTag; 3] = [ProviderTag::OpenAi, ProviderTag::Ollama, ProviderTag::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderTag {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "gemini" => Ok(Self::Gemini),
            other => Err(SummaryError::UnknownProvider(other.to_string())),
        }
    }
}

/// Body sent to the provisioning endpoint.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ProvisionRequest<'a> {
    pub ajax: bool,
    #[serde(rename = "_csrf")]
    pub csrf: &'a str,
}

/// `{ "response": { "error": bool, "data": ..., "provider": ... } }`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProvisionEnvelope {
    pub response: Option<ProvisionResponse>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProvisionResponse {
    #[serde(default)]
    pub error: Value,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub provider: Option<String>,
}

/// What the provisioning endpoint told us to do.
#[derive(Debug)]
pub enum Provisioned {
    /// Backend refused; message is shown as-is.
    Refused(String),
    Dispatch {
        provider: ProviderTag,
        descriptor: RequestDescriptor,
    },
}

impl ProvisionEnvelope {
    /// Validate the envelope at the boundary.
    pub fn into_provisioned(self) -> CoreResult<Provisioned> {
        let resp = self
            .response
            .ok_or_else(|| SummaryError::Provisioning("envelope has no `response`".into()))?;
        if !is_truthy(&resp.data) {
            return Err(SummaryError::Provisioning("envelope has no `response.data`".into()));
        }
        if is_truthy(&resp.error) {
            let msg = match resp.data {
                Value::String(s) => s,
                other => other.to_string(),
            };
            return Ok(Provisioned::Refused(msg));
        }
        let provider = resp
            .provider
            .as_deref()
            .unwrap_or_default()
            .parse::<ProviderTag>()?;
        let descriptor = RequestDescriptor::from_value(resp.data)?;
        Ok(Provisioned::Dispatch { provider, descriptor })
    }
}

/// Loose truthiness of a JSON value, matching what the host backend emits
/// (`0`, `""`, `false` and `null` are all "absent").
fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Backend-issued upstream call description. Lives for a single request.
pub struct RequestDescriptor {
    url: String,
    key: SecretString,
    fields: Map<String, Value>,
}

impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RequestDescriptor {
    pub fn from_value(v: Value) -> CoreResult<Self> {
        let Value::Object(fields) = v else {
            return Err(SummaryError::Validation("descriptor must be a JSON object".into()));
        };
        let url = match fields.get(URL_FIELD) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
            _ => return Err(SummaryError::Validation(format!("descriptor lacks `{URL_FIELD}`"))),
        };
        let key = match fields.get(KEY_FIELD) {
            Some(Value::String(s)) => SecretString::from(s.clone()),
            None | Some(Value::Null) => SecretString::from(String::new()),
            Some(_) => {
                return Err(SummaryError::Validation(format!("descriptor `{KEY_FIELD}` must be a string")));
            }
        };
        Ok(Self { url, key, fields })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.key.expose_secret())
    }

    /// The descriptor as sent upstream, credentials included.
    pub fn full_body(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// The descriptor minus the transport-only fields.
    pub fn forwarded_body(&self) -> Map<String, Value> {
        let mut body = self.fields.clone();
        body.remove(URL_FIELD);
        body.remove(KEY_FIELD);
        body
    }
}
