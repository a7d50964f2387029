//! Request-shaped context attached to an error record
//!
//! The caller picks the adapter when building the [`crate::ErrorRecord`]; the payload
//! builder only asks it for the `request` sub-document of the notice.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Turns a request-like object into the `request` section of a notice
pub trait RequestInfo: Debug + Send + Sync {
    fn to_document(&self) -> Map<String, Value>;
}

/// HTTP request context in the layout the notices API expects: `url`, optional
/// `component`/`action`, `params`, and `cgi_data` holding the method and headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequestInfo {
    pub url: String,
    pub method: String,
    pub component: Option<String>,
    pub action: Option<String>,
    pub params: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
}

impl HttpRequestInfo {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    fn cgi_data(&self) -> Map<String, Value> {
        let mut cgi = Map::new();
        cgi.insert(
            "REQUEST_METHOD".to_string(),
            Value::String(self.method.clone()),
        );
        for (name, value) in &self.headers {
            cgi.insert(cgi_header_name(name), Value::String(value.clone()));
        }
        cgi
    }
}

/// `user-agent` -> `HTTP_USER_AGENT`
fn cgi_header_name(name: &str) -> String {
    format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"))
}

impl RequestInfo for HttpRequestInfo {
    fn to_document(&self) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("url".to_string(), Value::String(self.url.clone()));
        if let Some(component) = &self.component {
            doc.insert("component".to_string(), Value::String(component.clone()));
        }
        if let Some(action) = &self.action {
            doc.insert("action".to_string(), Value::String(action.clone()));
        }
        let params = self
            .params
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        doc.insert("params".to_string(), Value::Object(params));
        doc.insert("cgi_data".to_string(), Value::Object(self.cgi_data()));
        doc
    }
}

impl<B> From<&http::Request<B>> for HttpRequestInfo {
    fn from(request: &http::Request<B>) -> Self {
        let uri = request.uri();
        let params = uri
            .query()
            .map(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let headers = request
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            url: uri.to_string(),
            method: request.method().as_str().to_string(),
            component: None,
            action: None,
            params,
            headers,
        }
    }
}
