//! Contract between the core and the HTTP layer.
//!
//! Collections and the login workflow never talk to `reqwest` directly. They
//! issue requests through the [`Transport`] trait, which hands back the
//! status code and the decoded body. The production implementation lives in
//! [`crate::http_utils`]; tests plug in a recording fake.

use std::collections::BTreeMap;

use serde_json::Value;
use strum::{Display, EnumString};
use thiserror::Error;

/// Error emitted by a [`Transport`] implementation
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("invalid request URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("unexpected response from server: HTTP {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },
    #[error("transport failure: {0}")]
    Other(String),
}

/// HTTP verbs the core issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Arguments for a single request.
///
/// `method` is optional so that argument sets can be layered with
/// [`RequestOptions::merge`]: an unset method never overrides a set one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub method: Option<Method>,
    pub query: BTreeMap<String, String>,
    pub form_params: BTreeMap<String, String>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self {
            method: Some(Method::Get),
            ..Self::default()
        }
    }

    pub fn post() -> Self {
        Self {
            method: Some(Method::Post),
            ..Self::default()
        }
    }

    /// The effective verb; requests default to GET
    pub fn method(&self) -> Method {
        self.method.unwrap_or_default()
    }

    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.insert(name.to_string(), value.into());
        self
    }

    pub fn with_form_param(mut self, name: &str, value: impl Into<String>) -> Self {
        self.form_params.insert(name.to_string(), value.into());
        self
    }

    /// Layers `other` on top of `self`. Values from `other` win.
    pub fn merge(&mut self, other: &RequestOptions) {
        if other.method.is_some() {
            self.method = other.method;
        }
        self.query
            .extend(other.query.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.form_params
            .extend(other.form_params.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Decoded response returned by a [`Transport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status_code: u16,
    pub data: Value,
}

impl Response {
    pub fn new(status_code: u16, data: Value) -> Self {
        Self { status_code, data }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Issues requests against the platform API.
///
/// Implementations are used from a single thread and shared through `Rc`,
/// which is why session state is installed through `&self`.
pub trait Transport {
    /// Performs one request and returns the decoded body.
    fn request(&self, path: &str, options: &RequestOptions) -> Result<Response, TransportError>;

    /// Follows every page of a listing and returns the union of all pages,
    /// in page order.
    fn paged_request(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<Response, TransportError>;

    /// Installs (or clears) the session token sent with later requests.
    fn authorize(&self, _session_token: Option<&str>) {}
}
