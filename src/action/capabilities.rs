use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PanelError;

/// Request shape accepted by `perform_request` inside action code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpRequest {
    pub url: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub ok: bool,
    /// Parsed JSON when the body is JSON, otherwise the raw text
    pub body: Value,
}

/// Network access handed to action code. The core treats requests and
/// responses as opaque; only implementations know about transport.
pub trait RequestCapability: Send + Sync {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PanelError>;
}

/// `RequestCapability` backed by a blocking `reqwest` client.
///
/// Action code runs on a blocking worker thread, so the blocking client is
/// safe to call from there.
pub struct HttpRequester {
    client: reqwest::blocking::Client,
}

impl HttpRequester {
    pub fn new(timeout: Duration) -> Result<Self, PanelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PanelError::Request {
                url: String::new(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }
}

impl RequestCapability for HttpRequester {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PanelError> {
        let fail = |message: String| PanelError::Request {
            url: request.url.clone(),
            message,
        };

        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|e| fail(format!("invalid method '{}': {}", request.method, e)))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(url = %request.url, method = %request.method, "performing request");

        let response = builder.send().map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        let text = response.text().map_err(|e| fail(e.to_string()))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(HttpResponse {
            status: status.as_u16(),
            ok: status.is_success(),
            body,
        })
    }
}

/// Rejects every request. Used when a host grants no network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRequests;

impl RequestCapability for NoRequests {
    fn perform(&self, request: &HttpRequest) -> Result<HttpResponse, PanelError> {
        Err(PanelError::Request {
            url: request.url.clone(),
            message: "requests are not available".into(),
        })
    }
}

/// Dashboard-style template interpolation.
pub trait VariableInterpolator: Send + Sync {
    fn replace(&self, template: &str) -> String;
}

// ${name}, ${name:fmt} or $name
static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w+)(?::\w+)?\}|\$(\w+)").expect("variable regex must compile")
});

/// Replaces `${name}`, `${name:format}` and `$name` from a fixed map.
/// Unknown variables are left as written.
pub struct VariableMap {
    vars: HashMap<String, String>,
}

impl VariableMap {
    pub fn new(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            vars: vars.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }
}

impl VariableInterpolator for VariableMap {
    fn replace(&self, template: &str) -> String {
        VARIABLE
            .replace_all(template, |caps: &Captures| {
                let name = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
                match name.and_then(|n| self.vars.get(n)) {
                    Some(v) => v.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Everything an action may reach beyond its parameters.
#[derive(Clone)]
pub struct Capabilities {
    pub requester: Arc<dyn RequestCapability>,
    pub variables: Arc<dyn VariableInterpolator>,
}

impl Capabilities {
    pub fn new(
        requester: Arc<dyn RequestCapability>,
        variables: Arc<dyn VariableInterpolator>,
    ) -> Self {
        Self {
            requester,
            variables,
        }
    }

    /// No network, no variables.
    pub fn offline() -> Self {
        Self::new(Arc::new(NoRequests), Arc::new(VariableMap::empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variables_replace_all_syntaxes() {
        let vars = VariableMap::new([
            ("host".to_string(), "db01".to_string()),
            ("env".to_string(), "prod".to_string()),
        ]);

        assert_eq!(vars.replace("Save to $host"), "Save to db01");
        assert_eq!(vars.replace("${host}-${env:text}"), "db01-prod");
        assert_eq!(vars.replace("keep $unknown"), "keep $unknown");
    }

    #[test]
    fn offline_capabilities_refuse_requests() {
        let caps = Capabilities::offline();
        let err = caps.requester.perform(&HttpRequest::get("http://localhost")).unwrap_err();
        assert!(matches!(err, PanelError::Request { .. }));
    }
}
