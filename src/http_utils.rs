//! HTTP transport for the platform API.
//!
//! [`HttpTransport`] is the production [`Transport`]: a blocking `reqwest`
//! client that resolves request paths against the API base URL, sends the
//! session token as a bearer token and decodes JSON bodies.

use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::configuration::Configuration;
use crate::transport::{Method, RequestOptions, Response, Transport, TransportError};

/// Settings shared by every request the transport sends
#[derive(Debug, Clone)]
pub struct HttpRequestConfig {
    /// Base URL that request paths are resolved against
    pub base_url: String,
    /// Headers included with all requests
    pub default_headers: HashMap<String, String>,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Records requested per page by paged requests
    pub page_size: usize,
}

impl Default for HttpRequestConfig {
    fn default() -> Self {
        Self::from_configuration(&Configuration::default())
    }
}

impl HttpRequestConfig {
    pub fn from_configuration(configuration: &Configuration) -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(
            "User-Agent".to_string(),
            format!("Terminus/{}", env!("CARGO_PKG_VERSION")),
        );
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            base_url: configuration.api_base_url(),
            default_headers,
            timeout: configuration.timeout_seconds(),
            page_size: configuration.page_size().max(1),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    config: HttpRequestConfig,
    session_token: RefCell<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: HttpRequestConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            config,
            session_token: RefCell::new(None),
        })
    }

    pub fn config(&self) -> &HttpRequestConfig {
        &self.config
    }

    /// Absolute URL of an API path
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        Ok(Url::parse(&self.config.base_url)?.join(path.trim_start_matches('/'))?)
    }

    fn build_request(&self, path: &str, options: &RequestOptions) -> Result<RequestBuilder, TransportError> {
        let url = self.url_for(path)?;
        let mut request = match options.method() {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url).form(&options.form_params),
        };

        if !options.query.is_empty() {
            request = request.query(&options.query);
        }

        if let Some(token) = self.session_token.borrow().as_deref() {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        for (key, value) in &self.config.default_headers {
            request = request.header(key, value);
        }

        Ok(request)
    }
}

impl Transport for HttpTransport {
    fn request(&self, path: &str, options: &RequestOptions) -> Result<Response, TransportError> {
        debug!("{} {}", options.method().to_string().to_uppercase(), path);
        let response = self.build_request(path, options)?.send()?;

        let status = response.status();
        trace!("Response status for {}: {}", path, status);
        if !status.is_success() {
            return Err(TransportError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let text = response.text()?;
        trace!("Raw response text: {}", text);
        let data = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text)?
        };

        Ok(Response::new(status.as_u16(), data))
    }

    fn paged_request(&self, path: &str, options: &RequestOptions) -> Result<Response, TransportError> {
        collect_pages(path, self.config.page_size, |limit, start| {
            let mut page_options = options.clone();
            page_options.merge(
                &RequestOptions::default()
                    .with_query("limit", limit.to_string())
                    .with_query("start", start.to_string()),
            );
            self.request(path, &page_options)
        })
    }

    fn authorize(&self, session_token: Option<&str>) {
        *self.session_token.borrow_mut() = session_token.map(str::to_string);
    }
}

/// Upper bound on pages fetched by one paged request
const MAX_PAGES: usize = 1000;

/// Requests pages of `limit` records until a short page, a page with nothing
/// new, or [`MAX_PAGES`] pages.
fn collect_pages<F>(path: &str, limit: usize, mut fetch_page: F) -> Result<Response, TransportError>
where
    F: FnMut(usize, usize) -> Result<Response, TransportError>,
{
    let mut combined = Value::Null;
    let mut status_code = None;
    let mut start = 0;

    for _ in 0..MAX_PAGES {
        let page = fetch_page(limit, start)?;
        status_code = Some(page.status_code);
        let merged = merge_page(&mut combined, page.data);
        trace!(
            "Received {} record(s), {} new, from {} at offset {}",
            merged.received,
            merged.added,
            path,
            start
        );

        if merged.received < limit || merged.added == 0 {
            return Ok(Response::new(status_code.unwrap_or(200), combined));
        }
        start += merged.received;
    }

    warn!("Stopped paging {} after {} pages", path, MAX_PAGES);
    Ok(Response::new(status_code.unwrap_or(200), combined))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageMerge {
    /// Records the page held
    received: usize,
    /// Records not already present in earlier pages
    added: usize,
}

/// Appends one page to the pages received so far. Array pages are
/// concatenated without repeats and object pages merged by key.
fn merge_page(combined: &mut Value, page: Value) -> PageMerge {
    let received = match &page {
        Value::Array(items) => items.len(),
        Value::Object(records) => records.len(),
        _ => return PageMerge { received: 0, added: 0 },
    };

    let added = match (combined, page) {
        (Value::Array(items), Value::Array(page)) => {
            let before = items.len();
            for item in page {
                if !items.contains(&item) {
                    items.push(item);
                }
            }
            items.len() - before
        }
        (Value::Object(records), Value::Object(page)) => {
            let before = records.len();
            records.extend(page);
            records.len() - before
        }
        (combined, page) => {
            *combined = page;
            received
        }
    };
    PageMerge { received, added }
}
